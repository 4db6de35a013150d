//! Direct in-process transport

use crate::{
    DeathRecipient, DeathRegistry, RemoteError, RemoteHandle, Transactable, TransportError,
};
use core_types::{HandleId, TransactionCode, TransactionFlags};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Handle that dispatches straight into a stub on the calling thread
pub struct LocalHandle {
    id: HandleId,
    target: Arc<dyn Transactable>,
    deaths: DeathRegistry,
}

impl LocalHandle {
    pub fn new(target: Arc<dyn Transactable>) -> Self {
        Self {
            id: HandleId::new(),
            target,
            deaths: DeathRegistry::new(),
        }
    }

    /// Convenience for the common `Arc<dyn RemoteHandle>` form
    pub fn shared(target: Arc<dyn Transactable>) -> Arc<Self> {
        Arc::new(Self::new(target))
    }

    /// Simulates the remote object dying
    ///
    /// Later transactions fail with `DeadObject`; recipients fire once.
    pub fn kill(&self) {
        self.deaths.mark_dead(self.id);
    }
}

impl RemoteHandle for LocalHandle {
    fn handle_id(&self) -> HandleId {
        self.id
    }

    fn transact(
        &self,
        code: TransactionCode,
        data: &[u8],
        flags: TransactionFlags,
    ) -> Result<Vec<u8>, RemoteError> {
        if self.deaths.is_dead() {
            return Err(TransportError::DeadObject.into());
        }
        trace!(handle = %self.id, %code, "local transaction");

        let result = self.target.on_transact(code, data, flags);
        if flags.is_oneway() {
            // Nobody waits for a oneway reply; failures only get logged.
            if let Err(err) = result {
                warn!(handle = %self.id, %code, error = %err, "oneway transaction failed");
            }
            return Ok(Vec::new());
        }
        result
    }

    fn is_alive(&self) -> bool {
        !self.deaths.is_dead()
    }

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), RemoteError> {
        self.deaths.link(recipient)
    }

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        self.deaths.unlink(recipient)
    }
}

impl fmt::Debug for LocalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalHandle")
            .field("id", &self.id)
            .field("descriptor", &self.target.descriptor())
            .field("deaths", &self.deaths)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Stub, TransactionTable};
    use core_types::InterfaceDescriptor;
    use ipc::Parcel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ECHO: InterfaceDescriptor = InterfaceDescriptor::new("test.IEcho");
    const SAY: TransactionCode = TransactionCode::FIRST_CALL;

    struct Echo;

    fn echo_stub() -> Arc<dyn Transactable> {
        let table = TransactionTable::<Echo>::builder(ECHO)
            .method(SAY, "echo", |_: &Echo, text: String| Ok(text))
            .build()
            .unwrap();
        Arc::new(Stub::new(Arc::new(table), Arc::new(Echo)))
    }

    fn echo_request(text: &str) -> Vec<u8> {
        let mut parcel = Parcel::new();
        parcel.write_interface_token(ECHO).unwrap();
        parcel.write_string(text).unwrap();
        parcel.into_bytes()
    }

    #[derive(Default)]
    struct Deaths(AtomicUsize);

    impl DeathRecipient for Deaths {
        fn binder_died(&self, _handle: HandleId) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_transact_reaches_stub() {
        let handle = LocalHandle::new(echo_stub());
        let reply = handle
            .transact(SAY, &echo_request("hi"), TransactionFlags::NONE)
            .unwrap();

        let mut parcel = Parcel::from_bytes(&reply);
        assert_eq!(parcel.read_exception().unwrap(), None);
        assert_eq!(parcel.read_string().unwrap(), "hi");
    }

    #[test]
    fn test_kill_fails_later_calls_and_notifies_once() {
        let handle = LocalHandle::new(echo_stub());
        let deaths = Arc::new(Deaths::default());
        handle.link_to_death(deaths.clone()).unwrap();

        handle.kill();
        handle.kill();

        assert!(!handle.is_alive());
        assert_eq!(deaths.0.load(Ordering::SeqCst), 1);
        let err = handle
            .transact(SAY, &echo_request("hi"), TransactionFlags::NONE)
            .unwrap_err();
        assert_eq!(err, RemoteError::Transport(TransportError::DeadObject));
    }

    #[test]
    fn test_oneway_swallows_reply() {
        let handle = LocalHandle::new(echo_stub());
        let reply = handle
            .transact(
                TransactionCode::nth_call(4),
                &echo_request("hi"),
                TransactionFlags::ONEWAY,
            )
            .unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn test_identity() {
        let a: Arc<dyn RemoteHandle> = LocalHandle::shared(echo_stub());
        let b: Arc<dyn RemoteHandle> = LocalHandle::shared(echo_stub());
        assert!(crate::same_handle(&a, &a.clone()));
        assert!(!crate::same_handle(&a, &b));
    }
}
