//! TOML-based application configuration.
//!
//! Stores tunables for:
//! - The background usage watcher (poll interval, host package, routes)
//! - The presence gate (light and motion thresholds, hold and pulse timing)
//! - Streak accounting (daily usage ceiling)
//! - Quota defaults for newly targeted apps
//!
//! Configuration is stored at `~/.config/touchgrass/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Usage watcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Package id of this app; never treated as the foreground target.
    #[serde(default = "default_host_package")]
    pub host_package: String,
    #[serde(default = "default_lock_route")]
    pub lock_route: String,
    #[serde(default = "default_home_route")]
    pub home_route: String,
}

/// Presence gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Lux strictly above this counts as direct sunlight.
    #[serde(default = "default_sun_lux_threshold")]
    pub sun_lux_threshold: f64,
    /// Accelerometer magnitude (g) strictly above this counts as moving.
    #[serde(default = "default_motion_high_g")]
    pub motion_high_g: f64,
    /// Accelerometer magnitude (g) strictly below this also counts as moving.
    #[serde(default = "default_motion_low_g")]
    pub motion_low_g: f64,
    #[serde(default = "default_sun_hold_ms")]
    pub sun_hold_ms: u64,
    #[serde(default = "default_hold_ms")]
    pub default_hold_ms: u64,
    #[serde(default = "default_pulse_interval_ms")]
    pub pulse_interval_ms: u64,
    /// Pulses before this share of the hold are light.
    #[serde(default = "default_light_pulse_fraction")]
    pub light_pulse_fraction: f64,
    /// Pulses before this share of the hold are medium; the rest heavy.
    #[serde(default = "default_medium_pulse_fraction")]
    pub medium_pulse_fraction: f64,
    /// Hours before this are night.
    #[serde(default = "default_night_before_hour")]
    pub night_before_hour: u32,
    /// Hours after this are night.
    #[serde(default = "default_night_after_hour")]
    pub night_after_hour: u32,
    #[serde(default = "default_release_animation_ms")]
    pub release_animation_ms: u64,
    #[serde(default = "default_light_sensor_interval_ms")]
    pub light_sensor_interval_ms: u64,
    #[serde(default = "default_motion_sensor_interval_ms")]
    pub motion_sensor_interval_ms: u64,
}

/// Streak configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakConfig {
    /// A day counts toward the streak when usage stayed below this.
    #[serde(default = "default_daily_ceiling_minutes")]
    pub daily_ceiling_minutes: u64,
}

/// Quota configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_quota_minutes")]
    pub default_quota_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/touchgrass/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub streak: StreakConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
}

// Default functions
fn default_poll_interval_secs() -> u64 {
    20
}
fn default_host_package() -> String {
    "com.t3mpest.touchgrass".into()
}
fn default_lock_route() -> String {
    "locked".into()
}
fn default_home_route() -> String {
    "home".into()
}
fn default_sun_lux_threshold() -> f64 {
    8000.0
}
fn default_motion_high_g() -> f64 {
    1.2
}
fn default_motion_low_g() -> f64 {
    0.8
}
fn default_sun_hold_ms() -> u64 {
    3000
}
fn default_hold_ms() -> u64 {
    5000
}
fn default_pulse_interval_ms() -> u64 {
    250
}
fn default_light_pulse_fraction() -> f64 {
    0.5
}
fn default_medium_pulse_fraction() -> f64 {
    0.8
}
fn default_night_before_hour() -> u32 {
    7
}
fn default_night_after_hour() -> u32 {
    19
}
fn default_release_animation_ms() -> u64 {
    300
}
fn default_light_sensor_interval_ms() -> u64 {
    1000
}
fn default_motion_sensor_interval_ms() -> u64 {
    500
}
fn default_daily_ceiling_minutes() -> u64 {
    240
}
fn default_quota_minutes() -> u32 {
    crate::usage::DEFAULT_QUOTA_MINUTES
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            host_package: default_host_package(),
            lock_route: default_lock_route(),
            home_route: default_home_route(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            sun_lux_threshold: default_sun_lux_threshold(),
            motion_high_g: default_motion_high_g(),
            motion_low_g: default_motion_low_g(),
            sun_hold_ms: default_sun_hold_ms(),
            default_hold_ms: default_hold_ms(),
            pulse_interval_ms: default_pulse_interval_ms(),
            light_pulse_fraction: default_light_pulse_fraction(),
            medium_pulse_fraction: default_medium_pulse_fraction(),
            night_before_hour: default_night_before_hour(),
            night_after_hour: default_night_after_hour(),
            release_animation_ms: default_release_animation_ms(),
            light_sensor_interval_ms: default_light_sensor_interval_ms(),
            motion_sensor_interval_ms: default_motion_sensor_interval_ms(),
        }
    }
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            daily_ceiling_minutes: default_daily_ceiling_minutes(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_quota_minutes: default_quota_minutes(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(n) if n.is_f64() => value
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `config.toml` inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults when the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed,
    /// or if the default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the value does not fit the existing type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Overwrite the stored config with defaults.
    pub fn reset() -> Result<Self, ConfigError> {
        let cfg = Self::default();
        cfg.save()?;
        Ok(cfg)
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "config unreadable, using defaults");
            Self::default()
        })
    }
}
