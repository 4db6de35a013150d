//! # Wire Contract Tests
//!
//! This crate provides "golden" tests for remote interfaces to ensure their
//! byte layouts don't drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: every request and reply layout is written
//!   out byte for byte
//! - **Testability first**: contract tests fail when an interface changes
//! - **Both directions**: what the proxy sends and what the stub answers
//!   are pinned separately
//!
//! ## Structure
//!
//! Each interface has a module with contract tests that verify:
//! - Interface descriptor and codec version
//! - Transaction codes
//! - Request layouts, as captured from the proxy
//! - Reply layouts, as produced by the stub

pub mod book_manager;
pub mod codec;

/// Common test helpers for contract validation
pub mod test_helpers {
    use core_types::{HandleId, InterfaceDescriptor, TransactionCode, TransactionFlags};
    use ipc::SchemaVersion;
    use remote_ipc::{DeathRecipient, RemoteError, RemoteHandle, Transactable};
    use std::sync::{Arc, Mutex};

    /// A request as it crossed the handle
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Captured {
        pub code: TransactionCode,
        pub request: Vec<u8>,
        pub reply: Vec<u8>,
    }

    /// Handle that forwards to a stub and records every exchange
    pub struct RecordingHandle {
        id: HandleId,
        target: Arc<dyn Transactable>,
        log: Mutex<Vec<Captured>>,
    }

    impl std::fmt::Debug for RecordingHandle {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RecordingHandle")
                .field("id", &self.id)
                .field("descriptor", &self.target.descriptor())
                .finish()
        }
    }

    impl RecordingHandle {
        pub fn new(target: Arc<dyn Transactable>) -> Arc<Self> {
            Arc::new(Self {
                id: HandleId::new(),
                target,
                log: Mutex::new(Vec::new()),
            })
        }

        /// Every exchange so far, oldest first
        pub fn captured(&self) -> Vec<Captured> {
            self.log.lock().expect("recording lock poisoned").clone()
        }

        /// The most recent exchange
        pub fn last(&self) -> Captured {
            self.captured()
                .pop()
                .expect("no transaction was recorded")
        }
    }

    impl RemoteHandle for RecordingHandle {
        fn handle_id(&self) -> HandleId {
            self.id
        }

        fn transact(
            &self,
            code: TransactionCode,
            data: &[u8],
            flags: TransactionFlags,
        ) -> Result<Vec<u8>, RemoteError> {
            let reply = self.target.on_transact(code, data, flags)?;
            self.log
                .lock()
                .expect("recording lock poisoned")
                .push(Captured {
                    code,
                    request: data.to_vec(),
                    reply: reply.clone(),
                });
            Ok(reply)
        }

        fn is_alive(&self) -> bool {
            true
        }

        fn link_to_death(&self, _recipient: Arc<dyn DeathRecipient>) -> Result<(), RemoteError> {
            Ok(())
        }

        fn unlink_to_death(&self, _recipient: &Arc<dyn DeathRecipient>) -> bool {
            false
        }
    }

    /// Concatenates byte fragments into one expected buffer
    pub fn golden(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    /// Expected interface token bytes
    pub fn token(descriptor: InterfaceDescriptor, version: SchemaVersion) -> Vec<u8> {
        let text = descriptor.as_str().as_bytes();
        golden(&[
            &version.major.to_le_bytes(),
            &version.minor.to_le_bytes(),
            &(text.len() as u32).to_le_bytes(),
            text,
        ])
    }

    /// Expected length-prefixed string bytes
    pub fn string(value: &str) -> Vec<u8> {
        let len = value.len() as u32;
        golden(&[&len.to_le_bytes(), value.as_bytes()])
    }

    /// Verifies a request starts with the expected interface token
    pub fn verify_token(request: &[u8], descriptor: InterfaceDescriptor, version: SchemaVersion) {
        let expected = token(descriptor, version);
        assert!(
            request.starts_with(&expected),
            "Interface token changed: expected {:?}, got {:?}",
            expected,
            &request[..expected.len().min(request.len())]
        );
    }
}
