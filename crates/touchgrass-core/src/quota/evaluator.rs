//! Quota evaluator.
//!
//! Stateless and pure: samples are assumed to be scoped to the intended
//! window already and are never re-windowed here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::usage::{QuotaMap, TrackedSet, UsageSample, WEEK_DAYS};

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub top_package_id: Option<String>,
    pub used_minutes: u64,
    pub violated: bool,
}

impl Evaluation {
    /// No foreground app, no violation.
    pub fn none() -> Self {
        Self {
            top_package_id: None,
            used_minutes: 0,
            violated: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuotaEvaluator {
    host_package: Option<String>,
}

impl QuotaEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluator that never reports the host app as the foreground app.
    pub fn for_host(host_package: impl Into<String>) -> Self {
        Self {
            host_package: Some(host_package.into()),
        }
    }

    /// The sample with the latest `last_foreground`. Equal timestamps keep
    /// the first one seen. When the host app itself is frontmost there is
    /// no decision to make and `None` is returned.
    pub fn current_foreground_app<'a>(&self, samples: &'a [UsageSample]) -> Option<&'a str> {
        let mut top: Option<&UsageSample> = None;
        for sample in samples {
            match top {
                Some(current) if sample.last_foreground <= current.last_foreground => {}
                _ => top = Some(sample),
            }
        }
        let top = top?;
        if self.host_package.as_deref() == Some(top.package_id.as_str()) {
            return None;
        }
        Some(top.package_id.as_str())
    }

    /// True when `package_id` is monitored and its whole used minutes have
    /// reached the quota.
    pub fn is_quota_exceeded(
        &self,
        package_id: &str,
        samples: &[UsageSample],
        quotas: &QuotaMap,
    ) -> bool {
        let quota = quotas.quota_minutes(package_id);
        if quota == 0 {
            return false;
        }
        used_minutes(package_id, samples) >= u64::from(quota)
    }

    pub fn evaluate(&self, samples: &[UsageSample], quotas: &QuotaMap) -> Evaluation {
        let Some(top) = self.current_foreground_app(samples) else {
            return Evaluation::none();
        };
        Evaluation {
            top_package_id: Some(top.to_string()),
            used_minutes: used_minutes(top, samples),
            violated: self.is_quota_exceeded(top, samples, quotas),
        }
    }
}

/// Whole minutes for one package.
fn used_minutes(package_id: &str, samples: &[UsageSample]) -> u64 {
    samples
        .iter()
        .find(|s| s.package_id == package_id)
        .map(UsageSample::used_minutes)
        .unwrap_or(0)
}

/// Minutes per tracked package. Untracked samples are dropped.
pub fn breakdown(samples: &[UsageSample], tracked: &TrackedSet) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for sample in samples.iter().filter(|s| tracked.contains(&s.package_id)) {
        *out.entry(sample.package_id.clone()).or_insert(0.0) += sample.minutes();
    }
    out
}

/// Sum of tracked minutes in one window.
pub fn tracked_total(samples: &[UsageSample], tracked: &TrackedSet) -> f64 {
    samples
        .iter()
        .filter(|s| tracked.contains(&s.package_id))
        .fold(0.0, |total, s| total + s.minutes())
}

/// Per-day tracked totals for the last seven days, oldest first.
///
/// `days` is ordered oldest to newest. Only the newest seven are used; when
/// fewer are supplied the older slots are zero.
pub fn weekly_totals(days: &[Vec<UsageSample>], tracked: &TrackedSet) -> [f64; WEEK_DAYS] {
    let mut totals = [0.0; WEEK_DAYS];
    let used = days.len().min(WEEK_DAYS);
    let offset = WEEK_DAYS - used;
    for (slot, day) in days[days.len() - used..].iter().enumerate() {
        totals[offset + slot] = tracked_total(day, tracked);
    }
    totals
}
