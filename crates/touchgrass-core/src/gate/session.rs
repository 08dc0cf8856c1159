//! Lock session - runs a [`PresenceGate`] against live sensors and timers.
//!
//! One session lives for as long as the lock screen is shown. It subscribes
//! to the light and motion sensors, forwards readings into the gate, and owns
//! the two timers of a running hold: the completion timer and the haptic
//! pulse ticker. Both timers are held in one [`HoldTimers`] value and are
//! aborted together whenever it is dropped.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::presence::{
    GateSnapshot, GateState, HapticPulse, HoldOutcome, PresenceGate, SensorReading,
};
use crate::events::Event;
use crate::ports::{HapticEmitter, Navigator, SensorKind, SensorSource, SensorSubscription};
use crate::storage::GateConfig;

const EVENT_CAPACITY: usize = 64;

/// Completion timer and pulse ticker of one hold.
struct HoldTimers {
    completion: JoinHandle<()>,
    pulses: JoinHandle<()>,
}

impl Drop for HoldTimers {
    fn drop(&mut self) {
        self.completion.abort();
        self.pulses.abort();
    }
}

struct Shared {
    gate: Mutex<PresenceGate>,
    timers: Mutex<Option<HoldTimers>>,
    navigator: Arc<dyn Navigator>,
    haptics: Arc<dyn HapticEmitter>,
    home_route: String,
    snapshots: watch::Sender<GateSnapshot>,
    events: broadcast::Sender<Event>,
}

impl Shared {
    fn gate(&self) -> MutexGuard<'_, PresenceGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timers(&self) -> MutexGuard<'_, Option<HoldTimers>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: GateSnapshot) {
        self.snapshots.send_replace(snapshot);
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn cancel_timers(&self) {
        drop(self.timers().take());
    }

    /// Called by the completion timer once the hold deadline has passed.
    fn resolve_hold(&self) {
        let now = now();
        let (outcome, snapshot) = {
            let mut gate = self.gate();
            let outcome = gate.poll(now);
            (outcome, gate.snapshot(now))
        };

        match outcome {
            Some(HoldOutcome::Unlocked) => {
                self.haptics.pulse(HapticPulse::Success);
                self.navigator.navigate_to(&self.home_route);
                self.emit(Event::Unlocked { at: Utc::now() });
            }
            Some(HoldOutcome::Failed) => {
                self.haptics.pulse(HapticPulse::Warning);
                self.emit(Event::HoldFailed { at: Utc::now() });
            }
            // Superseded by a release
            Some(HoldOutcome::InProgress) | None => return,
        }
        self.publish(snapshot);
        // Stops the pulse ticker. Aborting the running completion task is a
        // no-op since it returns without awaiting again.
        self.cancel_timers();
    }

    fn pulse(&self, count: u32) -> bool {
        let Some(pulse) = self.gate().pulse_for(count) else {
            return false;
        };
        self.haptics.pulse(pulse);
        self.emit(Event::Pulse {
            pulse,
            at: Utc::now(),
        });
        true
    }
}

/// Async driver for one lock screen.
///
/// Must be created inside a Tokio runtime.
pub struct LockSession {
    shared: Arc<Shared>,
    pulse_interval: Duration,
    cancel: CancellationToken,
    sensor_pump: Option<JoinHandle<()>>,
}

impl LockSession {
    /// Subscribe to sensors and show the gate in `Idle`.
    ///
    /// A sensor that cannot be subscribed is logged and skipped; the gate then
    /// keeps its resting defaults for that reading.
    pub fn start(
        config: GateConfig,
        local_hour: u32,
        sensors: &dyn SensorSource,
        navigator: Arc<dyn Navigator>,
        haptics: Arc<dyn HapticEmitter>,
        home_route: impl Into<String>,
    ) -> Self {
        let light = subscribe(sensors, SensorKind::Light, config.light_sensor_interval_ms);
        let motion = subscribe(sensors, SensorKind::Motion, config.motion_sensor_interval_ms);
        let pulse_interval = Duration::from_millis(config.pulse_interval_ms.max(1));

        let gate = PresenceGate::new(config, local_hour);
        let (snapshots, _) = watch::channel(gate.snapshot(now()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let shared = Arc::new(Shared {
            gate: Mutex::new(gate),
            timers: Mutex::new(None),
            navigator,
            haptics,
            home_route: home_route.into(),
            snapshots,
            events,
        });

        let cancel = CancellationToken::new();
        let sensor_pump = tokio::spawn(pump_sensors(shared.clone(), light, motion, cancel.clone()));

        Self {
            shared,
            pulse_interval,
            cancel,
            sensor_pump: Some(sensor_pump),
        }
    }

    pub fn snapshot(&self) -> GateSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<GateSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.events.subscribe()
    }

    pub fn is_unlocked(&self) -> bool {
        self.shared.gate().state() == GateState::Unlocked
    }

    /// Wait until the gate unlocks.
    pub async fn unlocked(&self) {
        let mut rx = self.watch();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|s| s.state == GateState::Unlocked).await;
    }

    pub fn press_start(&self) -> GateSnapshot {
        let now = now();
        let (started, target_ms, snapshot) = {
            let mut gate = self.shared.gate();
            let was_idle = gate.state() == GateState::Idle;
            let snapshot = gate.on_press_start(now);
            (was_idle && snapshot.state == GateState::Holding, gate.hold_target_ms(), snapshot)
        };

        if let (true, Some(target_ms)) = (started, target_ms) {
            let timers = self.spawn_timers(Duration::from_millis(target_ms));
            drop(self.shared.timers().replace(timers));
            self.shared.emit(Event::HoldStarted {
                required_hold_ms: target_ms,
                at: Utc::now(),
            });
        }
        self.shared.publish(snapshot.clone());
        snapshot
    }

    pub fn press_end(&self) -> GateSnapshot {
        // Timers go first so no completion can land after the release
        self.shared.cancel_timers();

        let now = now();
        let (progress, snapshot) = {
            let mut gate = self.shared.gate();
            let holding = gate.state() == GateState::Holding;
            let progress = gate.progress(now);
            (holding.then_some(progress), gate.on_press_end(now))
        };

        if let Some(progress) = progress {
            self.shared.emit(Event::HoldCancelled {
                progress,
                at: Utc::now(),
            });
        }
        self.shared.publish(snapshot.clone());
        snapshot
    }

    /// Cancel timers, unsubscribe both sensors and wait for the pump to stop.
    pub async fn close(mut self) {
        self.shared.cancel_timers();
        self.cancel.cancel();
        if let Some(pump) = self.sensor_pump.take() {
            if let Err(e) = pump.await {
                tracing::warn!(error = %e, "sensor pump ended abnormally");
            }
        }
    }

    fn spawn_timers(&self, hold: Duration) -> HoldTimers {
        let start = Instant::now();

        let shared = self.shared.clone();
        let completion = tokio::spawn(async move {
            time::sleep_until(start + hold).await;
            shared.resolve_hold();
        });

        let shared = self.shared.clone();
        let period = self.pulse_interval;
        let pulses = tokio::spawn(async move {
            let mut ticker = time::interval_at(start + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut count: u32 = 0;
            loop {
                ticker.tick().await;
                count = count.saturating_add(1);
                if !shared.pulse(count) {
                    break;
                }
            }
        });

        HoldTimers { completion, pulses }
    }
}

impl Drop for LockSession {
    fn drop(&mut self) {
        self.shared.cancel_timers();
        self.cancel.cancel();
        if let Some(pump) = self.sensor_pump.take() {
            pump.abort();
        }
    }
}

impl std::fmt::Debug for LockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockSession")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Gate clock. Follows Tokio's clock so paused-time tests line up.
fn now() -> std::time::Instant {
    Instant::now().into_std()
}

fn subscribe(sensors: &dyn SensorSource, kind: SensorKind, interval_ms: u64) -> Option<SensorSubscription> {
    match sensors.subscribe(kind, interval_ms) {
        Ok(sub) => Some(sub),
        Err(e) => {
            tracing::warn!(error = %e, ?kind, "sensor unavailable, continuing without it");
            None
        }
    }
}

async fn next_reading(sub: &mut Option<SensorSubscription>) -> Option<SensorReading> {
    match sub {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

async fn pump_sensors(
    shared: Arc<Shared>,
    mut light: Option<SensorSubscription>,
    mut motion: Option<SensorSubscription>,
    cancel: CancellationToken,
) {
    loop {
        let (kind, reading) = tokio::select! {
            _ = cancel.cancelled() => break,
            r = next_reading(&mut light) => (SensorKind::Light, r),
            r = next_reading(&mut motion) => (SensorKind::Motion, r),
        };

        let Some(reading) = reading else {
            tracing::debug!(?kind, "sensor stream ended");
            match kind {
                SensorKind::Light => light = None,
                SensorKind::Motion => motion = None,
            }
            continue;
        };

        let at = Utc::now();
        let snapshot = shared.gate().on_sensor_tick(reading, now());
        shared.emit(Event::from_snapshot(&snapshot, at));
        shared.publish(snapshot);
    }
    // Dropping the subscriptions here unsubscribes both listeners
    tracing::debug!("sensor pump stopped");
}
