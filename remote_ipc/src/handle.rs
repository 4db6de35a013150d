//! Remote handles and death notification

use crate::{RemoteError, TransportError};
use core_types::{HandleId, TransactionCode, TransactionFlags};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Opaque endpoint reference used to submit transactions
///
/// A handle is shared by reference (`Arc<dyn RemoteHandle>`); its identity
/// is [`RemoteHandle::handle_id`].
pub trait RemoteHandle: Send + Sync + fmt::Debug {
    /// Identity of the remote object behind this handle
    fn handle_id(&self) -> HandleId;

    /// Submits a transaction and blocks until its reply arrives
    ///
    /// With [`TransactionFlags::ONEWAY`] the call returns as soon as the
    /// transaction is queued, with an empty reply.
    fn transact(
        &self,
        code: TransactionCode,
        data: &[u8],
        flags: TransactionFlags,
    ) -> Result<Vec<u8>, RemoteError>;

    /// Whether the remote object can still receive transactions
    fn is_alive(&self) -> bool;

    /// Registers a recipient notified once when the remote object dies
    ///
    /// Fails with `DeadObject` if it is already dead.
    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), RemoteError>;

    /// Removes a recipient; returns whether it was registered
    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> bool;
}

/// Receives notice that a remote object died
pub trait DeathRecipient: Send + Sync {
    fn binder_died(&self, handle: HandleId);
}

/// Checks whether two handles refer to the same remote object
pub fn same_handle(a: &Arc<dyn RemoteHandle>, b: &Arc<dyn RemoteHandle>) -> bool {
    a.handle_id() == b.handle_id()
}

fn same_recipient(a: &Arc<dyn DeathRecipient>, b: &Arc<dyn DeathRecipient>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[derive(Default)]
struct DeathState {
    dead: bool,
    recipients: Vec<Arc<dyn DeathRecipient>>,
}

/// Liveness flag plus death recipient list shared by handle implementations
#[derive(Default)]
pub struct DeathRegistry {
    state: Mutex<DeathState>,
}

impl DeathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dead(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dead
    }

    pub fn link(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.dead {
            return Err(TransportError::DeadObject.into());
        }
        state.recipients.push(recipient);
        Ok(())
    }

    pub fn unlink(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.recipients.len();
        state.recipients.retain(|r| !same_recipient(r, recipient));
        state.recipients.len() != before
    }

    /// Marks the object dead and notifies recipients
    ///
    /// Returns `false` if it was already dead; recipients fire only once.
    pub fn mark_dead(&self, handle: HandleId) -> bool {
        let recipients = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.dead {
                return false;
            }
            state.dead = true;
            std::mem::take(&mut state.recipients)
        };
        debug!(%handle, recipients = recipients.len(), "remote object died");
        for recipient in recipients {
            recipient.binder_died(handle);
        }
        true
    }
}

impl fmt::Debug for DeathRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DeathRegistry")
            .field("dead", &state.dead)
            .field("recipients", &state.recipients.len())
            .finish()
    }
}
