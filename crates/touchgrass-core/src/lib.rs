//! # Touch Grass Core Library
//!
//! Decision core of the Touch Grass digital-wellbeing app. It watches per-app
//! daily screen time against user quotas, asks for a lock screen when the
//! foreground app goes over, and decides when a sensor-verified
//! "go outside" ritual has earned an unlock.
//!
//! Everything platform-specific (usage statistics, sensors, navigation,
//! haptics, storage) arrives through the traits in [`ports`] and
//! [`storage::KeyValueStore`], so the library runs the same on a phone, a
//! desktop or in tests.
//!
//! ## Architecture
//!
//! - **Quota Evaluator**: pure functions over usage samples; picks the
//!   foreground app and decides whether its quota is exceeded
//! - **Presence Gate**: clock-driven press-and-hold state machine fed by
//!   light and motion readings; [`LockSession`] drives it with real timers
//! - **Usage Watcher**: polling loop that turns violations into lock requests
//! - **Storage**: SQLite key-value store and TOML configuration
//!
//! ## Key Components
//!
//! - [`QuotaEvaluator`]: foreground selection and quota decisions
//! - [`PresenceGate`]: unlock ritual state machine
//! - [`UsageWatcher`]: background enforcement loop
//! - [`Database`]: persisted quotas, streak and onboarding flag
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod gate;
pub mod ports;
pub mod quota;
pub mod report;
pub mod storage;
pub mod streak;
pub mod usage;
pub mod watcher;

pub use error::{ConfigError, CoreError, SensorError, StoreError, UsageError, ValidationError};
pub use events::Event;
pub use gate::{GateMode, GateSnapshot, GateState, HapticPulse, HoldOutcome, LockSession, PresenceGate, SensorReading};
pub use ports::{Capabilities, HapticEmitter, Navigator, SensorKind, SensorSource, SensorSubscription, UsageSource};
pub use quota::{Evaluation, QuotaEvaluator, ViolationWatch, WatchState};
pub use report::{DayUsage, Reports};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, OnboardingFlag, QuotaStore, StreakStore};
pub use streak::{StreakChange, StreakTracker};
pub use usage::{DayWindow, QuotaMap, UsageSample};
pub use watcher::UsageWatcher;
