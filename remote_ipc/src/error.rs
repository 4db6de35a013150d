//! Error taxonomy for remote calls
//!
//! A remote call fails in exactly one of three ways, and callers can always
//! tell them apart:
//!
//! - [`TransportError`]: the round trip itself failed
//! - [`ProtocolError`]: the two ends disagree about the contract
//! - [`Status`]: the remote implementation reported a failure

use core_types::TransactionCode;
use ipc::{ParcelError, Status};
use thiserror::Error;

/// The handle is unusable or the round trip failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The remote object no longer exists
    #[error("Remote object is dead")]
    DeadObject,

    /// The transport lost its connection
    #[error("Transport disconnected: {0}")]
    Disconnected(String),

    /// Any other submission failure
    #[error("Transport failure: {0}")]
    Failed(String),
}

/// The two ends disagree about the wire contract
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Malformed request or reply, descriptor or version mismatch
    #[error("Codec error: {0}")]
    Codec(#[from] ParcelError),

    /// No method is registered under this code
    #[error("Unknown transaction code {0}")]
    UnknownTransaction(TransactionCode),

    /// Two methods were registered under the same code
    #[error("Duplicate transaction code {code} for '{name}'")]
    DuplicateTransaction {
        code: TransactionCode,
        name: &'static str,
    },

    /// A method code lies outside the user range
    #[error("Transaction code {0} outside the user call range")]
    CodeOutOfRange(TransactionCode),
}

/// Error returned by every remote call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Remote exception: {0}")]
    Application(#[from] Status),
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, RemoteError::Protocol(_))
    }

    /// The remote status, if this is an application error
    pub fn status(&self) -> Option<&Status> {
        match self {
            RemoteError::Application(status) => Some(status),
            _ => None,
        }
    }
}

impl From<ParcelError> for RemoteError {
    fn from(err: ParcelError) -> Self {
        RemoteError::Protocol(ProtocolError::Codec(err))
    }
}
