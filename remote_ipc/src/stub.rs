//! Server side of a remote interface
//!
//! A [`TransactionTable`] maps transaction codes to typed handlers. It is
//! built once per interface and shared by every [`Stub`] serving that
//! interface. The stub checks the interface token, finds the handler and
//! lets it decode arguments, call the implementation and encode the result.

use crate::{IpcConfig, ProtocolError, RemoteError};
use core_types::{InterfaceDescriptor, TransactionCode, TransactionFlags};
use ipc::{ExceptionCode, Parcel, ParcelPool, Parcelable, Status, VersionPolicy};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Anything that can answer a raw transaction
///
/// This is the object-safe face of a [`Stub`] that transports dispatch into.
pub trait Transactable: Send + Sync {
    fn descriptor(&self) -> InterfaceDescriptor;

    /// Handles one request and returns the encoded reply
    ///
    /// Protocol failures are returned as errors; failures raised by the
    /// implementation are encoded into the reply.
    fn on_transact(
        &self,
        code: TransactionCode,
        data: &[u8],
        flags: TransactionFlags,
    ) -> Result<Vec<u8>, RemoteError>;
}

/// How a handler finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The implementation returned a value
    Completed,
    /// The implementation raised an exception, now encoded in the reply
    Raised,
}

type Handler<T> =
    Box<dyn Fn(&T, &mut Parcel, &mut Parcel) -> Result<DispatchOutcome, RemoteError> + Send + Sync>;

/// A registered method
pub struct MethodEntry<T: ?Sized> {
    name: &'static str,
    handler: Handler<T>,
}

impl<T: ?Sized> MethodEntry<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Encodes a handler result into the reply parcel
///
/// Application failures become an exception header. Failures of any other
/// kind raised by the implementation (for example a nested remote call that
/// lost its transport) are reported to the caller as `TransactionFailed`.
pub fn write_result<R: Parcelable>(
    reply: &mut Parcel,
    result: Result<R, RemoteError>,
) -> Result<DispatchOutcome, RemoteError> {
    match result {
        Ok(value) => {
            reply.write_no_exception()?;
            reply.write(&value)?;
            Ok(DispatchOutcome::Completed)
        }
        Err(RemoteError::Application(status)) => {
            reply.write_exception(&status)?;
            Ok(DispatchOutcome::Raised)
        }
        Err(other) => {
            reply.write_exception(&Status::new(
                ExceptionCode::TransactionFailed,
                other.to_string(),
            ))?;
            Ok(DispatchOutcome::Raised)
        }
    }
}

/// Code-indexed dispatch table for one interface
pub struct TransactionTable<T: ?Sized> {
    descriptor: InterfaceDescriptor,
    methods: BTreeMap<TransactionCode, MethodEntry<T>>,
}

impl<T: ?Sized + 'static> TransactionTable<T> {
    pub fn builder(descriptor: InterfaceDescriptor) -> TransactionTableBuilder<T> {
        TransactionTableBuilder {
            descriptor,
            methods: BTreeMap::new(),
            error: None,
        }
    }

    pub fn descriptor(&self) -> InterfaceDescriptor {
        self.descriptor
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn method_name(&self, code: TransactionCode) -> Option<&'static str> {
        self.methods.get(&code).map(MethodEntry::name)
    }

    /// Registered codes with their method names, in code order
    pub fn methods(&self) -> impl Iterator<Item = (TransactionCode, &'static str)> + '_ {
        self.methods.iter().map(|(code, entry)| (*code, entry.name))
    }

    /// Runs the handler for `code`
    ///
    /// `data` must be positioned just past the interface token.
    pub fn dispatch(
        &self,
        service: &T,
        code: TransactionCode,
        data: &mut Parcel,
        reply: &mut Parcel,
    ) -> Result<DispatchOutcome, RemoteError> {
        let entry = self
            .methods
            .get(&code)
            .ok_or(ProtocolError::UnknownTransaction(code))?;
        trace!(descriptor = %self.descriptor, %code, method = entry.name, "dispatching");
        (entry.handler)(service, data, reply)
    }
}

impl<T: ?Sized> fmt::Debug for TransactionTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<_> = self.methods.iter().map(|(c, e)| (c, e.name)).collect();
        f.debug_struct("TransactionTable")
            .field("descriptor", &self.descriptor)
            .field("methods", &methods)
            .finish()
    }
}

/// Collects method registrations; errors surface from [`build`](Self::build)
pub struct TransactionTableBuilder<T: ?Sized> {
    descriptor: InterfaceDescriptor,
    methods: BTreeMap<TransactionCode, MethodEntry<T>>,
    error: Option<ProtocolError>,
}

impl<T: ?Sized + 'static> TransactionTableBuilder<T> {
    /// Registers a method taking `A` and returning `R`
    ///
    /// The generated handler decodes `A`, rejects leftover request bytes,
    /// calls `method` and encodes its result with [`write_result`].
    pub fn method<A, R, F>(mut self, code: TransactionCode, name: &'static str, method: F) -> Self
    where
        A: Parcelable + 'static,
        R: Parcelable + 'static,
        F: Fn(&T, A) -> Result<R, RemoteError> + Send + Sync + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        if !code.is_user_call() {
            self.error = Some(ProtocolError::CodeOutOfRange(code));
            return self;
        }
        if self.methods.contains_key(&code) {
            self.error = Some(ProtocolError::DuplicateTransaction { code, name });
            return self;
        }

        let handler: Handler<T> = Box::new(
            move |service: &T,
                  data: &mut Parcel,
                  reply: &mut Parcel|
                  -> Result<DispatchOutcome, RemoteError> {
                let args: A = data.read()?;
                data.finish()?;
                write_result(reply, method(service, args))
            },
        );
        self.methods.insert(code, MethodEntry { name, handler });
        self
    }

    pub fn build(self) -> Result<TransactionTable<T>, ProtocolError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(TransactionTable {
            descriptor: self.descriptor,
            methods: self.methods,
        })
    }
}

/// Dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubStats {
    /// Requests that reached a handler and produced a reply
    pub dispatched: u64,
    /// Requests refused with a protocol error
    pub rejected: u64,
    /// Replies carrying an exception
    pub application_failures: u64,
}

#[derive(Debug, Default)]
struct StubCounters {
    dispatched: AtomicU64,
    rejected: AtomicU64,
    application_failures: AtomicU64,
}

/// Serves one implementation through a shared transaction table
pub struct Stub<T: ?Sized> {
    table: Arc<TransactionTable<T>>,
    service: Arc<T>,
    policy: VersionPolicy,
    pool: Arc<ParcelPool>,
    counters: StubCounters,
}

impl<T: ?Sized + Send + Sync + 'static> Stub<T> {
    pub fn new(table: Arc<TransactionTable<T>>, service: Arc<T>) -> Self {
        Self {
            table,
            service,
            policy: VersionPolicy::default(),
            pool: IpcConfig::default().parcel_pool(),
            counters: StubCounters::default(),
        }
    }

    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pool(mut self, pool: Arc<ParcelPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn service(&self) -> &Arc<T> {
        &self.service
    }

    pub fn table(&self) -> &Arc<TransactionTable<T>> {
        &self.table
    }

    pub fn pool(&self) -> &Arc<ParcelPool> {
        &self.pool
    }

    pub fn stats(&self) -> StubStats {
        StubStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            application_failures: self.counters.application_failures.load(Ordering::Relaxed),
        }
    }

    fn handle(&self, code: TransactionCode, bytes: &[u8]) -> Result<Vec<u8>, RemoteError> {
        let mut data = self.pool.acquire();
        let mut reply = self.pool.acquire();

        let descriptor = self.table.descriptor();
        data.set_data(bytes)?;
        data.enforce_interface(descriptor, &self.policy)?;

        let outcome = self
            .table
            .dispatch(&*self.service, code, &mut data, &mut reply)?;
        if outcome == DispatchOutcome::Raised {
            self.counters
                .application_failures
                .fetch_add(1, Ordering::Relaxed);
        }
        Ok(reply.as_bytes().to_vec())
    }
}

impl<T: ?Sized + Send + Sync + 'static> Transactable for Stub<T> {
    fn descriptor(&self) -> InterfaceDescriptor {
        self.table.descriptor()
    }

    fn on_transact(
        &self,
        code: TransactionCode,
        data: &[u8],
        flags: TransactionFlags,
    ) -> Result<Vec<u8>, RemoteError> {
        match self.handle(code, data) {
            Ok(reply) => {
                self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
                if flags.is_oneway() {
                    return Ok(Vec::new());
                }
                Ok(reply)
            }
            Err(err) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    descriptor = %self.table.descriptor(),
                    %code,
                    error = %err,
                    "rejected transaction"
                );
                Err(err)
            }
        }
    }
}

impl<T: ?Sized> fmt::Debug for Stub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("descriptor", &self.table.descriptor)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc::{ParcelError, SchemaVersion};
    use std::sync::Mutex;

    const COUNTER: InterfaceDescriptor = InterfaceDescriptor::new("test.ICounter");
    const ADD: TransactionCode = TransactionCode::FIRST_CALL;
    const TOTAL: TransactionCode = TransactionCode::nth_call(1);

    #[derive(Default)]
    struct Counter {
        total: Mutex<i64>,
    }

    impl Counter {
        fn add(&self, amount: i64) -> Result<(), RemoteError> {
            if amount < 0 {
                return Err(Status::illegal_argument("negative amount").into());
            }
            *self.total.lock().unwrap() += amount;
            Ok(())
        }

        fn total(&self) -> Result<i64, RemoteError> {
            Ok(*self.total.lock().unwrap())
        }
    }

    fn table() -> Arc<TransactionTable<Counter>> {
        Arc::new(
            TransactionTable::<Counter>::builder(COUNTER)
                .method(ADD, "add", |c: &Counter, amount: i64| c.add(amount))
                .method(TOTAL, "total", |c: &Counter, (): ()| c.total())
                .build()
                .unwrap(),
        )
    }

    fn request(descriptor: &str, write: impl FnOnce(&mut Parcel)) -> Vec<u8> {
        let mut parcel = Parcel::new();
        parcel
            .write_interface_token_versioned(descriptor, ipc::CODEC_VERSION)
            .unwrap();
        write(&mut parcel);
        parcel.into_bytes()
    }

    fn send(
        stub: &Stub<Counter>,
        code: TransactionCode,
        write: impl FnOnce(&mut Parcel),
    ) -> Result<Vec<u8>, RemoteError> {
        let data = request(COUNTER.as_str(), write);
        stub.on_transact(code, &data, TransactionFlags::NONE)
    }

    #[test]
    fn test_builder_rejects_duplicate_code() {
        let err = TransactionTable::<Counter>::builder(COUNTER)
            .method(ADD, "add", |c: &Counter, amount: i64| c.add(amount))
            .method(ADD, "add_again", |c: &Counter, amount: i64| c.add(amount))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::DuplicateTransaction {
                code: ADD,
                name: "add_again"
            }
        );
    }

    #[test]
    fn test_builder_rejects_reserved_codes() {
        const ZERO: TransactionCode = TransactionCode::new(0);
        let err = TransactionTable::<Counter>::builder(COUNTER)
            .method(ZERO, "zero", |c: &Counter, (): ()| c.total())
            .build()
            .unwrap_err();
        assert_eq!(err, ProtocolError::CodeOutOfRange(ZERO));
    }

    #[test]
    fn test_method_names() {
        let table = table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.method_name(TOTAL), Some("total"));
        assert_eq!(
            table.methods().collect::<Vec<_>>(),
            vec![(ADD, "add"), (TOTAL, "total")]
        );
    }

    #[test]
    fn test_dispatch_success() {
        let stub = Stub::new(table(), Arc::new(Counter::default()));

        let reply = send(&stub, ADD, |p| p.write_i64(5).unwrap()).unwrap();
        assert_eq!(reply, vec![0, 0, 0, 0]);

        let reply = send(&stub, TOTAL, |_| {}).unwrap();
        let mut parcel = Parcel::from_bytes(&reply);
        assert_eq!(parcel.read_exception().unwrap(), None);
        assert_eq!(parcel.read_i64().unwrap(), 5);
        assert_eq!(stub.stats().dispatched, 2);
    }

    #[test]
    fn test_application_error_written_to_reply() {
        let stub = Stub::new(table(), Arc::new(Counter::default()));

        let reply = send(&stub, ADD, |p| p.write_i64(-1).unwrap()).unwrap();
        let mut parcel = Parcel::from_bytes(&reply);
        let status = parcel.read_exception().unwrap().unwrap();
        assert_eq!(status.exception_code(), ExceptionCode::IllegalArgument);
        assert_eq!(status.message(), "negative amount");
        assert_eq!(stub.stats().application_failures, 1);
    }

    #[test]
    fn test_foreign_descriptor_rejected_before_dispatch() {
        let counter = Arc::new(Counter::default());
        let stub = Stub::new(table(), counter.clone());

        let data = request("test.IOther", |p| p.write_i64(5).unwrap());
        let err = stub
            .on_transact(ADD, &data, TransactionFlags::NONE)
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::from(ParcelError::DescriptorMismatch {
                expected: COUNTER.as_str().to_string(),
                received: "test.IOther".to_string(),
            })
        );
        assert_eq!(*counter.total.lock().unwrap(), 0);
        assert_eq!(stub.stats().rejected, 1);
    }

    #[test]
    fn test_unknown_code() {
        let stub = Stub::new(table(), Arc::new(Counter::default()));
        let code = TransactionCode::nth_call(7);

        let err = send(&stub, code, |_| {}).unwrap_err();
        assert_eq!(
            err,
            RemoteError::Protocol(ProtocolError::UnknownTransaction(code))
        );
    }

    #[test]
    fn test_extra_arguments_rejected_before_invoking() {
        let counter = Arc::new(Counter::default());
        let stub = Stub::new(table(), counter.clone());

        let err = send(&stub, ADD, |p| {
            p.write_i64(5).unwrap();
            p.write_i32(1).unwrap();
        })
        .unwrap_err();
        assert_eq!(err, RemoteError::from(ParcelError::TrailingBytes(4)));
        assert_eq!(*counter.total.lock().unwrap(), 0);
    }

    #[test]
    fn test_missing_arguments_rejected() {
        let stub = Stub::new(table(), Arc::new(Counter::default()));

        let err = send(&stub, ADD, |p| p.write_i32(5).unwrap()).unwrap_err();
        assert_eq!(
            err,
            RemoteError::from(ParcelError::Truncated {
                needed: 8,
                remaining: 4
            })
        );
    }

    #[test]
    fn test_incompatible_codec_version_rejected() {
        let stub = Stub::new(table(), Arc::new(Counter::default()));
        let mut parcel = Parcel::new();
        parcel
            .write_interface_token_versioned(COUNTER.as_str(), SchemaVersion::new(2, 0))
            .unwrap();

        let err = stub
            .on_transact(TOTAL, parcel.as_bytes(), TransactionFlags::NONE)
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Protocol(ProtocolError::Codec(
                ParcelError::IncompatibleVersion { .. }
            ))
        ));
    }

    #[test]
    fn test_oneway_returns_empty_reply() {
        let counter = Arc::new(Counter::default());
        let stub = Stub::new(table(), counter.clone());

        let data = request(COUNTER.as_str(), |p| p.write_i64(3).unwrap());
        let reply = stub
            .on_transact(ADD, &data, TransactionFlags::ONEWAY)
            .unwrap();
        assert!(reply.is_empty());
        assert_eq!(*counter.total.lock().unwrap(), 3);
    }

    #[test]
    fn test_non_application_failure_becomes_transaction_failed() {
        let mut reply = Parcel::new();
        let err: RemoteError = crate::TransportError::DeadObject.into();
        let outcome = write_result::<i32>(&mut reply, Err(err)).unwrap();
        assert_eq!(outcome, DispatchOutcome::Raised);

        reply.set_data_position(0);
        let status = reply.read_exception().unwrap().unwrap();
        assert_eq!(status.exception_code(), ExceptionCode::TransactionFailed);
    }

    #[test]
    fn test_stub_parcels_returned_to_pool() {
        let stub = Stub::new(table(), Arc::new(Counter::default()));
        send(&stub, ADD, |_| {}).unwrap_err();
        send(&stub, TOTAL, |_| {}).unwrap();
        assert_eq!(stub.pool().stats().outstanding(), 0);
    }
}
