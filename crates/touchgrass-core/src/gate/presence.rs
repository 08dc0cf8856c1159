//! Presence gate - the press-and-hold ritual that dismisses the lock.
//!
//! The gate is a clock-driven state machine with no internal timers. The
//! caller feeds sensor readings and press events, and calls `poll()` when the
//! hold deadline passes. [`super::LockSession`] does this with real timers.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Holding -> Unlocked
//!           |
//!           +-> Idle   (released early, or full hold without light/motion)
//! ```
//!
//! ## Completion
//!
//! A full hold unlocks only when the light reading is above the sunlight
//! threshold or the accelerometer magnitude is away from 1 g. Night changes
//! the displayed mode but never satisfies completion on its own.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::storage::GateConfig;

/// Magnitude of a device at rest, in g.
const STATIONARY_G: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SensorReading {
    Light { lux: f64 },
    Motion { magnitude: f64 },
}

impl SensorReading {
    /// Motion reading from a 3-axis accelerometer sample in g.
    pub fn motion_from_axes(x: f64, y: f64, z: f64) -> Self {
        SensorReading::Motion {
            magnitude: (x * x + y * y + z * z).sqrt(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Idle,
    Holding,
    /// Terminal for the session.
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticPulse {
    Light,
    Medium,
    Heavy,
    /// Hold is running but light and motion are both missing.
    Error,
    /// Hold completed and unlocked.
    Success,
    /// Hold completed without light or motion.
    Warning,
}

/// Display label for the lock screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    SunVerified,
    Moonlight,
    Overcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldOutcome {
    InProgress,
    Unlocked,
    Failed,
}

/// Sensor-derived view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceState {
    pub lux: f64,
    pub motion_magnitude: f64,
    pub sun_verified: bool,
    pub moving: bool,
    pub night: bool,
    pub hold_started_at: Option<Instant>,
    pub required_hold_ms: u64,
}

/// What the lock screen renders after every input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub state: GateState,
    /// 0.0 .. 1.0 progress of the current hold.
    pub progress: f64,
    pub required_hold_ms: u64,
    pub sun_verified: bool,
    pub moving: bool,
    pub night: bool,
    pub mode: GateMode,
}

#[derive(Debug, Clone, Copy)]
struct ActiveHold {
    started_at: Instant,
    /// Hold length fixed when the press began.
    target_ms: u64,
}

#[derive(Debug, Clone)]
pub struct PresenceGate {
    config: GateConfig,
    state: GateState,
    lux: f64,
    motion_magnitude: f64,
    night: bool,
    hold: Option<ActiveHold>,
}

impl PresenceGate {
    /// New gate in `Idle`. `local_hour` (0-23) decides the night label.
    ///
    /// Until a sensor reports, light is 0 lux and the device is at rest, so
    /// a missing sensor leaves the long hold and no motion.
    pub fn new(config: GateConfig, local_hour: u32) -> Self {
        let night = is_night(&config, local_hour);
        Self {
            config,
            state: GateState::Idle,
            lux: 0.0,
            motion_magnitude: STATIONARY_G,
            night,
            hold: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn sun_verified(&self) -> bool {
        self.lux > self.config.sun_lux_threshold
    }

    /// Away from 1 g in either direction counts as moving.
    pub fn moving(&self) -> bool {
        self.motion_magnitude > self.config.motion_high_g
            || self.motion_magnitude < self.config.motion_low_g
    }

    pub fn night(&self) -> bool {
        self.night
    }

    /// Whether a hold finishing now would unlock.
    pub fn completion_ready(&self) -> bool {
        self.sun_verified() || self.moving()
    }

    pub fn required_hold_ms(&self) -> u64 {
        if self.sun_verified() {
            self.config.sun_hold_ms
        } else {
            self.config.default_hold_ms
        }
    }

    /// Length of the hold in progress, if any.
    pub fn hold_target_ms(&self) -> Option<u64> {
        self.hold.map(|h| h.target_ms)
    }

    pub fn mode(&self) -> GateMode {
        if self.sun_verified() {
            GateMode::SunVerified
        } else if self.night {
            GateMode::Moonlight
        } else {
            GateMode::Overcast
        }
    }

    pub fn progress(&self, now: Instant) -> f64 {
        match (self.state, self.hold) {
            (GateState::Unlocked, _) => 1.0,
            (GateState::Holding, Some(hold)) => {
                if hold.target_ms == 0 {
                    return 1.0;
                }
                let elapsed = now.saturating_duration_since(hold.started_at).as_millis() as f64;
                (elapsed / hold.target_ms as f64).min(1.0)
            }
            _ => 0.0,
        }
    }

    pub fn presence_state(&self) -> PresenceState {
        PresenceState {
            lux: self.lux,
            motion_magnitude: self.motion_magnitude,
            sun_verified: self.sun_verified(),
            moving: self.moving(),
            night: self.night,
            hold_started_at: self.hold.map(|h| h.started_at),
            required_hold_ms: self.required_hold_ms(),
        }
    }

    pub fn snapshot(&self, now: Instant) -> GateSnapshot {
        GateSnapshot {
            state: self.state,
            progress: self.progress(now),
            required_hold_ms: self.required_hold_ms(),
            sun_verified: self.sun_verified(),
            moving: self.moving(),
            night: self.night,
            mode: self.mode(),
        }
    }

    /// Pulse for the `count`-th tick (1-based) of the running hold.
    ///
    /// The first half of the hold is light, up to 80% medium, the rest
    /// heavy. Without light or motion every tick is an error pulse.
    pub fn pulse_for(&self, count: u32) -> Option<HapticPulse> {
        let hold = self.hold.filter(|_| self.state == GateState::Holding)?;
        if !self.completion_ready() {
            return Some(HapticPulse::Error);
        }
        let total = hold.target_ms as f64 / self.config.pulse_interval_ms.max(1) as f64;
        let count = f64::from(count);
        Some(if count < total * self.config.light_pulse_fraction {
            HapticPulse::Light
        } else if count < total * self.config.medium_pulse_fraction {
            HapticPulse::Medium
        } else {
            HapticPulse::Heavy
        })
    }

    // ── Inputs ───────────────────────────────────────────────────────

    pub fn on_sensor_tick(&mut self, reading: SensorReading, now: Instant) -> GateSnapshot {
        match reading {
            SensorReading::Light { lux } if lux.is_finite() => self.lux = lux,
            SensorReading::Motion { magnitude } if magnitude.is_finite() => {
                self.motion_magnitude = magnitude
            }
            other => tracing::debug!(?other, "dropping non-finite sensor reading"),
        }
        self.snapshot(now)
    }

    /// Recompute the night label, e.g. when the hour rolls over.
    pub fn set_local_hour(&mut self, local_hour: u32) {
        self.night = is_night(&self.config, local_hour);
    }

    /// Begin a hold. The hold length is fixed from the current light reading.
    pub fn on_press_start(&mut self, now: Instant) -> GateSnapshot {
        if self.state == GateState::Idle {
            let target_ms = self.required_hold_ms();
            self.hold = Some(ActiveHold {
                started_at: now,
                target_ms,
            });
            self.state = GateState::Holding;
            tracing::debug!(target_ms, "hold started");
        }
        self.snapshot(now)
    }

    /// Release the press. Any unfinished hold is discarded without credit.
    pub fn on_press_end(&mut self, now: Instant) -> GateSnapshot {
        if self.state == GateState::Holding {
            let progress = self.progress(now);
            self.reset_hold();
            tracing::debug!(progress, "hold released early");
        }
        self.snapshot(now)
    }

    /// Resolve the running hold once its deadline has passed.
    ///
    /// Returns `None` when no hold is running.
    pub fn poll(&mut self, now: Instant) -> Option<HoldOutcome> {
        if self.state != GateState::Holding {
            return None;
        }
        let hold = self.hold?;
        let elapsed = now.saturating_duration_since(hold.started_at).as_millis() as u64;
        if elapsed < hold.target_ms {
            return Some(HoldOutcome::InProgress);
        }

        if self.completion_ready() {
            self.state = GateState::Unlocked;
            self.hold = None;
            tracing::info!(
                lux = self.lux,
                magnitude = self.motion_magnitude,
                "presence verified, unlocking"
            );
            Some(HoldOutcome::Unlocked)
        } else {
            self.reset_hold();
            tracing::info!(
                lux = self.lux,
                magnitude = self.motion_magnitude,
                "hold finished without light or motion"
            );
            Some(HoldOutcome::Failed)
        }
    }

    fn reset_hold(&mut self) {
        self.state = GateState::Idle;
        self.hold = None;
    }
}

fn is_night(config: &GateConfig, local_hour: u32) -> bool {
    local_hour < config.night_before_hour || local_hour > config.night_after_hour
}
