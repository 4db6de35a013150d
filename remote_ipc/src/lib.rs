//! # Remote interfaces: proxies, stubs and transports
//!
//! This crate turns method calls into numbered transactions and back.
//!
//! - A **proxy** ([`ProxyCore`]) marshals arguments into a request parcel,
//!   submits it through a [`RemoteHandle`] and unmarshals the reply.
//! - A **stub** ([`Stub`]) checks the interface token, dispatches on the
//!   transaction code through a [`TransactionTable`] and encodes the result
//!   or the raised exception.
//! - **Transports** carry the bytes: [`LocalHandle`] calls the stub
//!   directly, [`ServiceThread`] hosts it on a dedicated thread.
//!
//! ## Philosophy
//!
//! - **One contract, two ends**: proxy and stub share the descriptor, the
//!   codes and the codec; any disagreement is a [`ProtocolError`]
//! - **Three failure kinds**: transport, protocol and application errors
//!   stay distinct all the way to the caller
//! - **No hidden retries**: a failed transaction is reported, not replayed
//! - **Explicit liveness**: dead objects fail fast and notify their
//!   [`DeathRecipient`]s exactly once

pub mod config;
pub mod error;
pub mod fault_injection;
pub mod handle;
pub mod local;
pub mod proxy;
pub mod stub;
pub mod thread;

pub use config::{ConfigError, IpcConfig};
pub use error::{ProtocolError, RemoteError, TransportError};
pub use handle::{same_handle, DeathRecipient, DeathRegistry, RemoteHandle};
pub use local::LocalHandle;
pub use proxy::{Proxy, ProxyCore};
pub use stub::{
    write_result, DispatchOutcome, MethodEntry, Stub, StubStats, Transactable, TransactionTable,
    TransactionTableBuilder,
};
pub use thread::{ServiceThread, ThreadHandle};
