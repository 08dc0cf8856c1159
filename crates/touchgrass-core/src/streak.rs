//! Daily streak of days kept under the usage ceiling.
//!
//! The streak advances at most once per local date. It grows when the
//! previous active day stayed under the ceiling and resets otherwise.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::events::Event;
use crate::storage::{KeyValueStore, StreakConfig, StreakRecord, StreakStore};

/// How a day's check-in moved the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// Already counted today.
    Unchanged,
    /// First check-in ever.
    Started,
    /// Yesterday stayed under the ceiling.
    Extended,
    /// Yesterday went over the ceiling, or days were skipped.
    Reset,
}

/// Next streak value for a check-in on `today`.
pub fn next_streak(
    record: &StreakRecord,
    today: NaiveDate,
    daily_ceiling_minutes: f64,
) -> (u32, StreakChange) {
    let Some(last) = record.last_active_date else {
        return (1, StreakChange::Started);
    };
    if last == today {
        return (record.streak_count, StreakChange::Unchanged);
    }
    if today.pred_opt() == Some(last) && record.last_day_usage_minutes < daily_ceiling_minutes {
        (record.streak_count.saturating_add(1), StreakChange::Extended)
    } else {
        (0, StreakChange::Reset)
    }
}

/// Applies check-ins against the persisted streak.
pub struct StreakTracker<'a, S: KeyValueStore + ?Sized> {
    store: StreakStore<'a, S>,
    config: StreakConfig,
}

impl<'a, S: KeyValueStore + ?Sized> StreakTracker<'a, S> {
    pub fn new(store: &'a S, config: StreakConfig) -> Self {
        Self {
            store: StreakStore::new(store),
            config,
        }
    }

    pub fn current(&self) -> Result<StreakRecord, StoreError> {
        self.store.load()
    }

    /// Record a check-in for the local date `today` with `usage_minutes`
    /// of screen time so far.
    ///
    /// Returns an event when the streak was recomputed. Today's usage is
    /// stored either way, so the last check-in of a day is what the next
    /// day compares against the ceiling.
    pub fn check_in(&self, today: NaiveDate, usage_minutes: f64) -> Result<Option<Event>, StoreError> {
        let record = self.store.load()?;
        let (streak, change) = next_streak(&record, today, self.config.daily_ceiling_minutes as f64);

        let event = if change == StreakChange::Unchanged {
            None
        } else {
            self.store.save_streak(today, streak)?;
            tracing::info!(streak, previous = record.streak_count, ?change, "streak updated");
            Some(Event::StreakUpdated {
                streak,
                previous: record.streak_count,
                date: today,
            })
        };

        let usage = if usage_minutes.is_finite() { usage_minutes.max(0.0) } else { 0.0 };
        self.store.save_last_day_usage(usage)?;
        Ok(event)
    }
}
