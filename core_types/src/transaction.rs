//! Transaction addressing: interface descriptors, method codes and flags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable token naming a remote interface contract
///
/// The token is written at the head of every request and compared by the
/// receiving stub. It is declared once per interface as a `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceDescriptor(&'static str);

impl InterfaceDescriptor {
    /// Declares a descriptor
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the descriptor text
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Checks whether a token read off the wire names this interface
    pub fn matches(&self, token: &str) -> bool {
        self.0 == token
    }
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Integer identifying one method within an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionCode(u32);

impl TransactionCode {
    /// First code available to interface methods
    pub const FIRST_CALL: TransactionCode = TransactionCode(0x0000_0001);

    /// Last code available to interface methods
    ///
    /// Codes above this are reserved for transport-level control traffic.
    pub const LAST_CALL: TransactionCode = TransactionCode(0x00ff_ffff);

    /// Creates a transaction code from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Code of the `index`-th method of an interface (zero based)
    pub const fn nth_call(index: u32) -> Self {
        Self(Self::FIRST_CALL.0 + index)
    }

    /// Returns the raw value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Checks whether the code is within the user method range
    pub fn is_user_call(&self) -> bool {
        *self >= Self::FIRST_CALL && *self <= Self::LAST_CALL
    }
}

impl fmt::Display for TransactionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

/// Flags accompanying a transaction submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TransactionFlags(u32);

impl TransactionFlags {
    /// Synchronous call: the submitter blocks until the reply arrives
    pub const NONE: TransactionFlags = TransactionFlags(0);

    /// Fire-and-forget: no reply is produced or awaited
    pub const ONEWAY: TransactionFlags = TransactionFlags(0x01);

    /// Creates flags from raw bits
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Checks whether all bits of `other` are set
    pub fn contains(&self, other: TransactionFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Shorthand for `contains(ONEWAY)`
    pub fn is_oneway(&self) -> bool {
        self.contains(Self::ONEWAY)
    }
}
