//! Screen-time reports over a [`UsageSource`].
//!
//! Every report takes its day windows from the caller, so the same report
//! can be rebuilt for any date or timezone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::UsageError;
use crate::ports::UsageSource;
use crate::quota;
use crate::usage::{DayWindow, QuotaMap, UsageSample, WEEK_DAYS};

/// Minutes spent in one app on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayUsage {
    pub date: NaiveDate,
    pub minutes: f64,
}

pub struct Reports<'a, U: UsageSource> {
    source: &'a U,
}

impl<'a, U: UsageSource> Reports<'a, U> {
    pub fn new(source: &'a U) -> Self {
        Self { source }
    }

    /// Screen time so far today. Counts every app while nothing is tracked,
    /// and only tracked apps otherwise.
    pub async fn today_screen_time(&self, today: DayWindow, quotas: &QuotaMap) -> Result<f64, UsageError> {
        let samples = self.source.query_usage(today).await?;
        Ok(screen_time(&samples, quotas))
    }

    /// Minutes per tracked app today.
    pub async fn today_breakdown(
        &self,
        today: DayWindow,
        quotas: &QuotaMap,
    ) -> Result<BTreeMap<String, f64>, UsageError> {
        let samples = self.source.query_usage(today).await?;
        Ok(quota::breakdown(&samples, &quotas.tracked()))
    }

    /// Tracked minutes for each of `days`, oldest first.
    ///
    /// Pass [`DayWindow::trailing_days`] with [`WEEK_DAYS`] for the weekly
    /// chart.
    pub async fn weekly_totals(
        &self,
        days: &[DayWindow],
        quotas: &QuotaMap,
    ) -> Result<[f64; WEEK_DAYS], UsageError> {
        let mut per_day = Vec::with_capacity(days.len());
        for window in days {
            per_day.push(self.source.query_usage(*window).await?);
        }
        Ok(quota::weekly_totals(&per_day, &quotas.tracked()))
    }

    /// Daily minutes of one app over `days`, oldest first.
    pub async fn app_history(&self, package_id: &str, days: &[DayWindow]) -> Result<Vec<DayUsage>, UsageError> {
        let mut history = Vec::with_capacity(days.len());
        for window in days {
            let samples = self.source.query_usage(*window).await?;
            let minutes = samples
                .iter()
                .filter(|s| s.package_id == package_id)
                .fold(0.0, |total, s| total + s.minutes());
            history.push(DayUsage {
                date: window.date,
                minutes,
            });
        }
        Ok(history)
    }
}

/// Total minutes the user should see as "screen time" for one window.
pub fn screen_time(samples: &[UsageSample], quotas: &QuotaMap) -> f64 {
    let tracked = quotas.tracked();
    if tracked.is_empty() {
        samples.iter().fold(0.0, |total, s| total + s.minutes())
    } else {
        quota::tracked_total(samples, &tracked)
    }
}
