//! Codec error types

use crate::SchemaVersion;
use thiserror::Error;

/// Errors raised while writing or reading a parcel
///
/// Every variant describes a contract violation between the two ends of a
/// transaction. None of them is recoverable by re-reading the same bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParcelError {
    /// The reader needed more bytes than the parcel holds
    #[error("Parcel truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A presence flag was neither 0 nor 1
    #[error("Invalid presence flag: {0:#04x}")]
    InvalidPresenceFlag(u8),

    /// A boolean byte was neither 0 nor 1
    #[error("Invalid boolean value: {0:#04x}")]
    InvalidBool(u8),

    /// String bytes were not valid UTF-8
    #[error("String is not valid UTF-8")]
    InvalidUtf8,

    /// A length prefix cannot possibly fit in the remaining bytes
    #[error("Length prefix {count} exceeds remaining {remaining} bytes")]
    LengthOverflow { count: usize, remaining: usize },

    /// A write would grow the parcel past its size limit
    #[error("Parcel too large: {size} bytes exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },

    /// The exception header carried a code this codec does not know
    #[error("Unknown exception code: {0}")]
    UnknownExceptionCode(i32),

    /// A method finished decoding with bytes left over
    #[error("{0} trailing bytes after last field")]
    TrailingBytes(usize),

    /// The request names a different interface
    #[error("Interface descriptor mismatch: expected '{expected}', received '{received}'")]
    DescriptorMismatch { expected: String, received: String },

    /// The request was written by an incompatible codec version
    #[error("Codec version {received} incompatible with supported range {min}-{current}")]
    IncompatibleVersion {
        received: SchemaVersion,
        min: SchemaVersion,
        current: SchemaVersion,
    },
}
