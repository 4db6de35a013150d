//! # Core Types
//!
//! This crate defines the fundamental types shared by both ends of a
//! remote interface.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: Descriptors and codes are typed and cannot be
//!   confused with plain strings and integers.
//! - **Stable by construction**: Everything here is part of the wire contract
//!   and is fixed at interface-definition time.
//!
//! ## Key Types
//!
//! - [`HandleId`]: Identity of a remote endpoint
//! - [`InterfaceDescriptor`]: Token naming an interface contract
//! - [`TransactionCode`]: Method number within an interface
//! - [`TransactionFlags`]: Submission flags (synchronous or oneway)

pub mod ids;
pub mod transaction;

pub use ids::HandleId;
pub use transaction::{InterfaceDescriptor, TransactionCode, TransactionFlags};
