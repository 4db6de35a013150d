//! # IPC Host
//!
//! This crate hosts the book manager behind a service thread and drives it
//! through proxies, the way a real client process would.
//!
//! ## Philosophy
//!
//! - **Host owns I/O**: services and proxies only log; the host prints
//! - **Same path as production**: every call crosses the proxy, the
//!   transport and the stub
//! - **Deterministic summary**: a run produces a [`HostReport`] tests can
//!   check
//!
//! ## Responsibilities
//!
//! The host:
//! - Loads an `IpcConfig` (or uses the defaults)
//! - Hosts a `BookStore` on a `ServiceThread`
//! - Runs client threads that add and list books through proxies
//! - Shuts the service down and reports what happened

pub mod runtime;

pub use runtime::{HostReport, HostRuntime, HostRuntimeConfig, HostRuntimeError};
