//! Application-level failures carried in the reply header
//!
//! Every reply begins with an exception header:
//!
//! ```text
//! i32 code                       0 = no exception
//! string message                 only if code != 0
//! i32 service-specific error     only if code == ServiceSpecific
//! ```

use crate::{Parcel, ParcelError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Header value for a successful reply
pub const NO_EXCEPTION: i32 = 0;

/// Kinds of failure a remote implementation can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionCode {
    Security,
    BadParcelable,
    IllegalArgument,
    NullPointer,
    IllegalState,
    UnsupportedOperation,
    /// Interface-defined error carrying its own numeric code
    ServiceSpecific,
    TransactionFailed,
}

impl ExceptionCode {
    /// Wire value of this code
    pub const fn as_i32(&self) -> i32 {
        match self {
            ExceptionCode::Security => -1,
            ExceptionCode::BadParcelable => -2,
            ExceptionCode::IllegalArgument => -3,
            ExceptionCode::NullPointer => -4,
            ExceptionCode::IllegalState => -5,
            ExceptionCode::UnsupportedOperation => -7,
            ExceptionCode::ServiceSpecific => -8,
            ExceptionCode::TransactionFailed => -129,
        }
    }

    /// Maps a wire value back to a code; `None` for unknown values
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -1 => Some(ExceptionCode::Security),
            -2 => Some(ExceptionCode::BadParcelable),
            -3 => Some(ExceptionCode::IllegalArgument),
            -4 => Some(ExceptionCode::NullPointer),
            -5 => Some(ExceptionCode::IllegalState),
            -7 => Some(ExceptionCode::UnsupportedOperation),
            -8 => Some(ExceptionCode::ServiceSpecific),
            -129 => Some(ExceptionCode::TransactionFailed),
            _ => None,
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExceptionCode::Security => "Security",
            ExceptionCode::BadParcelable => "BadParcelable",
            ExceptionCode::IllegalArgument => "IllegalArgument",
            ExceptionCode::NullPointer => "NullPointer",
            ExceptionCode::IllegalState => "IllegalState",
            ExceptionCode::UnsupportedOperation => "UnsupportedOperation",
            ExceptionCode::ServiceSpecific => "ServiceSpecific",
            ExceptionCode::TransactionFailed => "TransactionFailed",
        };
        f.write_str(name)
    }
}

/// A failure raised by the remote implementation
///
/// Travels in the reply header and is re-raised on the proxy side with the
/// same code and message.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{exception}: {message}")]
pub struct Status {
    exception: ExceptionCode,
    message: String,
    service_specific_error: i32,
}

impl Status {
    /// Creates a status for `exception` with a message
    pub fn new(exception: ExceptionCode, message: impl Into<String>) -> Self {
        Self {
            exception,
            message: message.into(),
            service_specific_error: 0,
        }
    }

    /// Creates an interface-defined error
    pub fn service_specific(error: i32, message: impl Into<String>) -> Self {
        Self {
            exception: ExceptionCode::ServiceSpecific,
            message: message.into(),
            service_specific_error: error,
        }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(ExceptionCode::IllegalArgument, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(ExceptionCode::IllegalState, message)
    }

    pub fn exception_code(&self) -> ExceptionCode {
        self.exception
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Interface-defined code; zero unless the exception is `ServiceSpecific`
    pub fn service_specific_error(&self) -> i32 {
        self.service_specific_error
    }
}

impl Parcel {
    /// Writes the header of a successful reply
    pub fn write_no_exception(&mut self) -> Result<(), ParcelError> {
        self.write_i32(NO_EXCEPTION)
    }

    /// Writes the header of a failed reply
    pub fn write_exception(&mut self, status: &Status) -> Result<(), ParcelError> {
        self.write_i32(status.exception.as_i32())?;
        self.write_string(&status.message)?;
        if status.exception == ExceptionCode::ServiceSpecific {
            self.write_i32(status.service_specific_error)?;
        }
        Ok(())
    }

    /// Reads the reply header
    ///
    /// Returns `Ok(None)` for a successful reply, `Ok(Some(status))` for a
    /// reported failure, and `Err` if the header itself is malformed.
    pub fn read_exception(&mut self) -> Result<Option<Status>, ParcelError> {
        let code = self.read_i32()?;
        if code == NO_EXCEPTION {
            return Ok(None);
        }
        let Some(exception) = ExceptionCode::from_i32(code) else {
            return Err(ParcelError::UnknownExceptionCode(code));
        };
        let message = self.read_string()?;
        let service_specific_error = if exception == ExceptionCode::ServiceSpecific {
            self.read_i32()?
        } else {
            0
        };
        Ok(Some(Status {
            exception,
            message,
            service_specific_error,
        }))
    }
}
