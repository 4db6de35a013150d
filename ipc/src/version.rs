//! Codec versioning
//!
//! Every request carries the codec version its writer used. The receiving
//! stub holds a [`VersionPolicy`] and refuses requests it cannot read.

use crate::ParcelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Codec version written by this crate
pub const CODEC_VERSION: SchemaVersion = SchemaVersion::new(1, 0);

/// Version of the parcel wire layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u32,
    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl SchemaVersion {
    /// Creates a new schema version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Compatibility result for version checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Versions are compatible
    Compatible,
    /// Writer version is too old, upgrade required
    UpgradeRequired,
    /// Writer version is newer than anything this reader understands
    Unsupported,
}

/// Range of codec versions a reader accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPolicy {
    current: SchemaVersion,
    min_major: u32,
}

impl VersionPolicy {
    /// Accepts only the major version of `CODEC_VERSION`
    pub const fn codec() -> Self {
        Self::current(CODEC_VERSION.major, CODEC_VERSION.minor)
    }

    /// Creates a policy accepting only the given major version
    pub const fn current(major: u32, minor: u32) -> Self {
        Self {
            current: SchemaVersion::new(major, minor),
            min_major: major,
        }
    }

    /// Sets the minimum supported major version
    ///
    /// If current is v3.0 and min_major is 2, the policy accepts v2.x and
    /// v3.x and rejects v1.x and v4.x.
    pub const fn with_min_major(mut self, min_major: u32) -> Self {
        self.min_major = min_major;
        self
    }

    /// Classifies an incoming version
    pub fn check_compatibility(&self, incoming: &SchemaVersion) -> Compatibility {
        if incoming.major > self.current.major {
            return Compatibility::Unsupported;
        }
        if incoming.major < self.min_major {
            return Compatibility::UpgradeRequired;
        }
        Compatibility::Compatible
    }

    /// Fails with `IncompatibleVersion` unless `incoming` is compatible
    pub fn require(&self, incoming: SchemaVersion) -> Result<(), ParcelError> {
        match self.check_compatibility(&incoming) {
            Compatibility::Compatible => Ok(()),
            Compatibility::UpgradeRequired | Compatibility::Unsupported => {
                Err(ParcelError::IncompatibleVersion {
                    received: incoming,
                    min: self.min_version(),
                    current: self.current,
                })
            }
        }
    }

    /// Returns the current version
    pub fn current_version(&self) -> SchemaVersion {
        self.current
    }

    /// Returns the minimum supported version
    pub fn min_version(&self) -> SchemaVersion {
        SchemaVersion::new(self.min_major, 0)
    }
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self::codec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_policy_accepts_minor_bumps() {
        let policy = VersionPolicy::codec();
        assert!(policy.require(CODEC_VERSION).is_ok());
        assert!(policy
            .require(SchemaVersion::new(CODEC_VERSION.major, 7))
            .is_ok());
    }

    #[test]
    fn test_policy_rejects_other_majors() {
        let policy = VersionPolicy::current(3, 0).with_min_major(2);

        assert_eq!(
            policy.check_compatibility(&SchemaVersion::new(2, 9)),
            Compatibility::Compatible
        );
        assert_eq!(
            policy.check_compatibility(&SchemaVersion::new(1, 0)),
            Compatibility::UpgradeRequired
        );
        assert_eq!(
            policy.check_compatibility(&SchemaVersion::new(4, 0)),
            Compatibility::Unsupported
        );

        let err = policy.require(SchemaVersion::new(4, 0)).unwrap_err();
        assert_eq!(
            err,
            ParcelError::IncompatibleVersion {
                received: SchemaVersion::new(4, 0),
                min: SchemaVersion::new(2, 0),
                current: SchemaVersion::new(3, 0),
            }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SchemaVersion::new(1, 2).to_string(), "v1.2");
    }
}
