mod config;
pub mod database;
pub mod keys;
mod memory;

pub use config::{Config, GateConfig, QuotaConfig, StreakConfig, WatcherConfig};
pub use database::Database;
pub use keys::{OnboardingFlag, QuotaStore, StreakRecord, StreakStore};
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StoreError};

/// Flat string-keyed storage. Values are JSON text.
///
/// Writes come from a single logical writer; last write wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Returns the data directory, creating it if needed.
///
/// `TOUCHGRASS_DATA_DIR` wins when set. Otherwise `~/.config/touchgrass/`,
/// or `~/.config/touchgrass-dev/` when `TOUCHGRASS_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TOUCHGRASS_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TOUCHGRASS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("touchgrass-dev")
            } else {
                base_dir.join("touchgrass")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
