//! Core error types for touchgrass-core.
//!
//! Absence of data (no usage permission, no sensors, corrupt persisted state)
//! is not an error in the decision core. These types cover the boundaries:
//! storage, configuration, the capability ports and input validation.

use std::path::PathBuf;
use thiserror::Error;

use crate::ports::SensorKind;

/// Core error type for touchgrass-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Usage data source errors
    #[error("Usage source error: {0}")]
    Usage(#[from] UsageError),

    /// Sensor source errors
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Enforcement cannot start without the listed OS capabilities
    #[error("Missing capabilities: {}", missing.join(", "))]
    MissingCapabilities { missing: Vec<&'static str> },

    /// Enforcement cannot start with an empty quota map
    #[error("No target apps selected")]
    NoTargets,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// In-memory store mutex was poisoned
    #[error("Store poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not name a configuration value
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors reported by a [`crate::ports::UsageSource`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// Usage-stats permission has not been granted
    #[error("usage statistics permission not granted")]
    PermissionDenied,

    /// The OS service failed or is absent
    #[error("usage statistics unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by a [`crate::ports::SensorSource`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The device has no sensor of this kind
    #[error("{0:?} sensor not present")]
    Unavailable(SensorKind),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Empty identifier
    #[error("Empty identifier: {0}")]
    Empty(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
