use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::{GateSnapshot, GateState, HapticPulse};

/// Every decision the core makes produces an Event.
/// The presentation layer consumes them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The foreground app reached its daily quota.
    QuotaViolated {
        package_id: String,
        used_minutes: u64,
        quota_minutes: u32,
        at: DateTime<Utc>,
    },
    /// The watcher asked for the lock screen.
    LockRequested {
        package_id: String,
        at: DateTime<Utc>,
    },
    /// The lock screen was dismissed and watching resumed.
    LockReleased {
        at: DateTime<Utc>,
    },
    HoldStarted {
        required_hold_ms: u64,
        at: DateTime<Utc>,
    },
    /// Press released before the hold completed.
    HoldCancelled {
        progress: f64,
        at: DateTime<Utc>,
    },
    /// Hold ran its full duration without light or motion.
    HoldFailed {
        at: DateTime<Utc>,
    },
    Pulse {
        pulse: HapticPulse,
        at: DateTime<Utc>,
    },
    Unlocked {
        at: DateTime<Utc>,
    },
    GateSnapshot {
        state: GateState,
        progress: f64,
        required_hold_ms: u64,
        sun_verified: bool,
        moving: bool,
        at: DateTime<Utc>,
    },
    StreakUpdated {
        streak: u32,
        previous: u32,
        date: NaiveDate,
    },
}

impl Event {
    pub fn from_snapshot(snapshot: &GateSnapshot, at: DateTime<Utc>) -> Self {
        Event::GateSnapshot {
            state: snapshot.state,
            progress: snapshot.progress,
            required_hold_ms: snapshot.required_hold_ms,
            sun_verified: snapshot.sun_verified,
            moving: snapshot.moving,
            at,
        }
    }
}
