use chrono::{Local, Timelike, Utc};
use clap::Subcommand;
use serde::Serialize;
use std::time::{Duration, Instant};
use touchgrass_core::{Config, Event, GateSnapshot, HapticPulse, HoldOutcome, PresenceGate, SensorReading};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum GateAction {
    /// Show the gate for the given readings without holding
    Status {
        #[command(flatten)]
        readings: Readings,
    },
    /// Replay one press-and-hold against fixed readings
    Simulate {
        #[command(flatten)]
        readings: Readings,
        /// How long the press is held, in ms. Defaults to the required hold.
        #[arg(long)]
        hold_ms: Option<u64>,
    },
}

#[derive(clap::Args)]
pub struct Readings {
    /// Ambient light in lux
    #[arg(long, default_value_t = 0.0)]
    lux: f64,
    /// Accelerometer magnitude in g
    #[arg(long, default_value_t = 1.0, conflicts_with = "axes")]
    magnitude: f64,
    /// Accelerometer sample as x,y,z in g
    #[arg(long, value_delimiter = ',', num_args = 3, allow_negative_numbers = true)]
    axes: Option<Vec<f64>>,
    /// Local hour (0-23), defaults to now
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
    hour: Option<u32>,
}

impl Readings {
    fn gate(&self, now: Instant) -> PresenceGate {
        let hour = self.hour.unwrap_or_else(|| Local::now().hour());
        let mut gate = PresenceGate::new(Config::load_or_default().gate, hour);
        let motion = match self.axes.as_deref() {
            Some([x, y, z]) => SensorReading::motion_from_axes(*x, *y, *z),
            _ => SensorReading::Motion {
                magnitude: self.magnitude,
            },
        };
        gate.on_sensor_tick(SensorReading::Light { lux: self.lux }, now);
        gate.on_sensor_tick(motion, now);
        gate
    }
}

#[derive(Serialize)]
struct Simulation {
    outcome: Outcome,
    events: Vec<Event>,
    haptics: Vec<HapticPulse>,
    snapshot: GateSnapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Unlocked,
    Failed,
    Released,
}

pub fn run(action: GateAction) -> CliResult {
    let t0 = Instant::now();
    match action {
        GateAction::Status { readings } => {
            let gate = readings.gate(t0);
            print_json(&gate.snapshot(t0))?;
        }
        GateAction::Simulate { readings, hold_ms } => {
            let gate = readings.gate(t0);
            print_json(&simulate(gate, t0, hold_ms))?;
        }
    }
    Ok(())
}

fn simulate(mut gate: PresenceGate, t0: Instant, hold_ms: Option<u64>) -> Simulation {
    let wall = Utc::now();
    let at = |ms: u64| wall + chrono::Duration::milliseconds(ms as i64);

    let mut events = Vec::new();
    let mut haptics = Vec::new();

    gate.on_press_start(t0);
    let target_ms = gate.hold_target_ms().unwrap_or_else(|| gate.required_hold_ms());
    let held_ms = hold_ms.unwrap_or(target_ms);
    events.push(Event::HoldStarted {
        required_hold_ms: target_ms,
        at: at(0),
    });

    let interval = gate.config().pulse_interval_ms.max(1);
    let last_tick = held_ms.min(target_ms);
    let mut count = 1u32;
    while u64::from(count) * interval <= last_tick {
        let Some(pulse) = gate.pulse_for(count) else {
            break;
        };
        haptics.push(pulse);
        events.push(Event::Pulse {
            pulse,
            at: at(u64::from(count) * interval),
        });
        count += 1;
    }

    let outcome = if held_ms < target_ms {
        let end = t0 + Duration::from_millis(held_ms);
        let progress = gate.progress(end);
        gate.on_press_end(end);
        events.push(Event::HoldCancelled {
            progress,
            at: at(held_ms),
        });
        Outcome::Released
    } else {
        match gate.poll(t0 + Duration::from_millis(target_ms)) {
            Some(HoldOutcome::Unlocked) => {
                haptics.push(HapticPulse::Success);
                events.push(Event::Unlocked { at: at(target_ms) });
                Outcome::Unlocked
            }
            _ => {
                haptics.push(HapticPulse::Warning);
                events.push(Event::HoldFailed { at: at(target_ms) });
                Outcome::Failed
            }
        }
    };

    let end = t0 + Duration::from_millis(held_ms);
    let snapshot = gate.snapshot(end);
    events.push(Event::from_snapshot(&snapshot, at(held_ms)));

    Simulation {
        outcome,
        events,
        haptics,
        snapshot,
    }
}
