//! Capability interfaces the host platform provides.
//!
//! Every OS binding the core needs is injected through one of these traits,
//! so the evaluator, gate and watcher run without a device.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;

use crate::error::{SensorError, UsageError};
use crate::gate::{HapticPulse, SensorReading};
use crate::usage::{DayWindow, UsageSample};

/// Per-day usage statistics.
pub trait UsageSource: Send + Sync {
    /// Samples for `window`, at most one per package.
    fn query_usage(
        &self,
        window: DayWindow,
    ) -> impl Future<Output = Result<Vec<UsageSample>, UsageError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Light,
    Motion,
}

/// Push stream of readings for one sensor. Dropping it unsubscribes.
pub struct SensorSubscription {
    kind: SensorKind,
    readings: mpsc::Receiver<SensorReading>,
    on_unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl SensorSubscription {
    pub fn new(kind: SensorKind, readings: mpsc::Receiver<SensorReading>) -> Self {
        Self {
            kind,
            readings,
            on_unsubscribe: None,
        }
    }

    /// Run `hook` when the subscription is dropped, e.g. to detach a native
    /// listener.
    pub fn with_unsubscribe(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_unsubscribe = Some(Box::new(hook));
        self
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Next reading, or `None` once the source stops.
    pub async fn next(&mut self) -> Option<SensorReading> {
        self.readings.recv().await
    }
}

impl Drop for SensorSubscription {
    fn drop(&mut self) {
        self.readings.close();
        if let Some(hook) = self.on_unsubscribe.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for SensorSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSubscription")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

pub trait SensorSource: Send + Sync {
    /// Start receiving readings at roughly `interval_ms`.
    fn subscribe(&self, kind: SensorKind, interval_ms: u64)
        -> Result<SensorSubscription, SensorError>;
}

/// Opaque navigation trigger.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, route: &str);
}

/// Fire-and-forget tactile feedback.
pub trait HapticEmitter: Send + Sync {
    fn pulse(&self, pulse: HapticPulse);
}

/// OS permissions, reported by the platform layer as plain flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub usage_stats: bool,
    pub overlay: bool,
    pub notifications: bool,
    /// App is exempt from battery optimisation; advisory only.
    pub battery_unrestricted: bool,
}

impl Capabilities {
    /// Permissions required before enforcement can start.
    pub fn missing_for_enforcement(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.notifications {
            missing.push("notifications");
        }
        if !self.overlay {
            missing.push("overlay");
        }
        if !self.usage_stats {
            missing.push("usage_stats");
        }
        missing
    }

    pub fn can_enforce(&self) -> bool {
        self.missing_for_enforcement().is_empty()
    }
}
