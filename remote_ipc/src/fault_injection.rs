//! Deterministic fault injection for testing
//!
//! [`FaultyHandle`] wraps a real handle and applies a [`FaultPlan`] to the
//! transactions passing through it. Submissions are numbered from 1 so a
//! plan can target an exact call.
//!
//! ## Example
//!
//! ```
//! use remote_ipc::fault_injection::{FaultPlan, TransactionFault};
//!
//! let plan = FaultPlan::new()
//!     .with_fault(TransactionFault::FailTransport { on_call: 2 })
//!     .with_fault(TransactionFault::TruncateReply { on_call: 3 });
//! assert_eq!(plan.faults().len(), 2);
//! ```

use crate::{DeathRecipient, RemoteError, RemoteHandle, TransportError};
use core_types::{HandleId, TransactionCode, TransactionFlags};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A fault applied to one numbered submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionFault {
    /// Fail before the request reaches the remote side
    FailTransport { on_call: usize },

    /// Deliver the request, then lose the reply
    FailAfterDelivery { on_call: usize },

    /// Deliver the request, then hand back these bytes instead of the reply
    ReplaceReply { on_call: usize, bytes: Vec<u8> },

    /// Deliver the request, then drop the last byte of the reply
    TruncateReply { on_call: usize },
}

impl TransactionFault {
    fn on_call(&self) -> usize {
        match self {
            TransactionFault::FailTransport { on_call }
            | TransactionFault::FailAfterDelivery { on_call }
            | TransactionFault::ReplaceReply { on_call, .. }
            | TransactionFault::TruncateReply { on_call } => *on_call,
        }
    }
}

/// All faults to inject, configured per test
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    faults: Vec<TransactionFault>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(mut self, fault: TransactionFault) -> Self {
        self.faults.push(fault);
        self
    }

    pub fn faults(&self) -> &[TransactionFault] {
        &self.faults
    }

    fn fault_for(&self, call: usize) -> Option<&TransactionFault> {
        self.faults.iter().find(|fault| fault.on_call() == call)
    }
}

/// Handle wrapper that injects transport and reply faults
#[derive(Debug)]
pub struct FaultyHandle {
    inner: Arc<dyn RemoteHandle>,
    plan: FaultPlan,
    calls: AtomicUsize,
}

impl FaultyHandle {
    pub fn new(inner: Arc<dyn RemoteHandle>, plan: FaultPlan) -> Self {
        Self {
            inner,
            plan,
            calls: AtomicUsize::new(0),
        }
    }

    /// Submissions seen so far, faulted or not
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteHandle for FaultyHandle {
    fn handle_id(&self) -> HandleId {
        self.inner.handle_id()
    }

    fn transact(
        &self,
        code: TransactionCode,
        data: &[u8],
        flags: TransactionFlags,
    ) -> Result<Vec<u8>, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fault = self.plan.fault_for(call);
        if let Some(fault) = fault {
            debug!(call, %code, ?fault, "injecting fault");
        }

        if let Some(TransactionFault::FailTransport { .. }) = fault {
            let reason = format!("injected failure on call {}", call);
            return Err(TransportError::Failed(reason).into());
        }

        let reply = self.inner.transact(code, data, flags)?;
        match fault {
            Some(TransactionFault::FailAfterDelivery { .. }) => {
                let reason = format!("injected reply loss on call {}", call);
                Err(TransportError::Disconnected(reason).into())
            }
            Some(TransactionFault::ReplaceReply { bytes, .. }) => Ok(bytes.clone()),
            Some(TransactionFault::TruncateReply { .. }) => {
                let mut reply = reply;
                reply.pop();
                Ok(reply)
            }
            _ => Ok(reply),
        }
    }

    fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), RemoteError> {
        self.inner.link_to_death(recipient)
    }

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        self.inner.unlink_to_death(recipient)
    }
}
