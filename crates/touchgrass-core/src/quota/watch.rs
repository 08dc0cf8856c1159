//! Violation watch - decides when to ask for the lock screen.
//!
//! ## States
//!
//! ```text
//! Watching -> (violation) -> LockRequested -> (unlock) -> Watching
//! ```
//!
//! A violation seen while a lock is already requested is ignored, so the
//! lock screen is requested at most once per lock-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evaluator::Evaluation;
use crate::events::Event;
use crate::usage::QuotaMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WatchState {
    Watching,
    LockRequested {
        package_id: String,
        requested_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationWatch {
    state: WatchState,
}

impl Default for ViolationWatch {
    fn default() -> Self {
        Self {
            state: WatchState::Watching,
        }
    }
}

impl ViolationWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, WatchState::LockRequested { .. })
    }

    /// Feed one evaluation. Returns the events produced by a new lock
    /// request: the violation followed by the request itself.
    pub fn observe(
        &mut self,
        evaluation: &Evaluation,
        quotas: &QuotaMap,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        if !evaluation.violated || self.is_locked() {
            return Vec::new();
        }
        let Some(package_id) = evaluation.top_package_id.clone() else {
            return Vec::new();
        };

        self.state = WatchState::LockRequested {
            package_id: package_id.clone(),
            requested_at: at,
        };
        vec![
            Event::QuotaViolated {
                package_id: package_id.clone(),
                used_minutes: evaluation.used_minutes,
                quota_minutes: quotas.quota_minutes(&package_id),
                at,
            },
            Event::LockRequested { package_id, at },
        ]
    }

    /// Return to watching after the lock screen was dismissed.
    pub fn release(&mut self, at: DateTime<Utc>) -> Option<Event> {
        if !self.is_locked() {
            return None;
        }
        self.state = WatchState::Watching;
        Some(Event::LockReleased { at })
    }
}
