//! # Inter-Process Communication (IPC) codec
//!
//! This crate defines the transaction codec shared by both ends of a remote
//! interface: the [`Parcel`] byte buffer, the [`Parcelable`] encode/decode
//! contract, the reply exception header ([`Status`]), codec versioning, and
//! the scratch [`ParcelPool`].
//!
//! ## Philosophy
//!
//! - **Total, stable encoding**: every value has exactly one layout, fixed
//!   at interface-definition time
//! - **Loud failures**: a short read, a stray byte, or a bad flag is a
//!   [`ParcelError`], never a default value
//! - **Scoped buffers**: pooled parcels go back to the pool when dropped
//!
//! ## Layout
//!
//! ```text
//! request = [interface token][arg1]...[argN]
//! reply   = [exception header][return value, only if no exception]
//! ```

pub mod error;
pub mod parcel;
pub mod parcelable;
pub mod pool;
pub mod status;
pub mod version;

pub use error::ParcelError;
pub use parcel::{Parcel, DEFAULT_MAX_PARCEL_SIZE};
pub use parcelable::Parcelable;
pub use pool::{ParcelPool, PoolStats, PooledParcel};
pub use status::{ExceptionCode, Status, NO_EXCEPTION};
pub use version::{Compatibility, SchemaVersion, VersionPolicy, CODEC_VERSION};
