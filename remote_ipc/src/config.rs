//! Runtime configuration for proxies, stubs and service threads
//!
//! Configuration is plain data with serde support so that hosts can load it
//! from a JSON file. Every field has a default; a file only needs the fields
//! it overrides.

use ipc::{ParcelPool, DEFAULT_MAX_PARCEL_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported config version {found}, expected at most {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings shared by the proxy and stub sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Version of the config format
    pub version: u32,
    /// Idle parcels kept by each pool
    pub pool_capacity: usize,
    /// Bytes preallocated for a fresh parcel
    pub initial_parcel_capacity: usize,
    /// Upper bound on request and reply size
    pub max_parcel_size: usize,
    /// Transactions a service thread queues before submitters block
    pub service_queue_depth: usize,
    /// Name given to service threads
    pub thread_name: String,
}

impl IpcConfig {
    /// Current version of the config format
    pub const CURRENT_VERSION: u32 = 1;

    /// Parses a JSON document and validates it
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: IpcConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file and validates it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version > Self::CURRENT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                supported: Self::CURRENT_VERSION,
            });
        }
        if self.max_parcel_size == 0 {
            return Err(ConfigError::Invalid(
                "max_parcel_size must be non-zero".to_string(),
            ));
        }
        if self.initial_parcel_capacity > self.max_parcel_size {
            return Err(ConfigError::Invalid(format!(
                "initial_parcel_capacity {} exceeds max_parcel_size {}",
                self.initial_parcel_capacity, self.max_parcel_size
            )));
        }
        if self.service_queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "service_queue_depth must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds a parcel pool sized by this config
    pub fn parcel_pool(&self) -> Arc<ParcelPool> {
        Arc::new(ParcelPool::new(
            self.pool_capacity,
            self.initial_parcel_capacity,
            self.max_parcel_size,
        ))
    }
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            pool_capacity: 8,
            initial_parcel_capacity: 256,
            max_parcel_size: DEFAULT_MAX_PARCEL_SIZE,
            service_queue_depth: 16,
            thread_name: "ipc-service".to_string(),
        }
    }
}
