//! Usage data model: per-app samples, the quota map and query windows.

mod sample;
mod window;

pub use sample::{QuotaMap, TrackedSet, UsageSample, DEFAULT_QUOTA_MINUTES};
pub use window::{DayWindow, WEEK_DAYS};
