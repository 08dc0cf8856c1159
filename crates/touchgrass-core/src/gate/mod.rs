//! Presence gate and the lock session that drives it.

mod presence;
mod session;

pub use presence::{
    GateMode, GateSnapshot, GateState, HapticPulse, HoldOutcome, PresenceGate, PresenceState,
    SensorReading,
};
pub use session::LockSession;
