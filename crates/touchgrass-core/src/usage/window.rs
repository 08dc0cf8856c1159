//! Day-aligned query windows.
//!
//! Windows are always computed by the caller and handed to a usage source.
//! A full day runs from local midnight to 23:59:59.999; "today" runs from
//! local midnight to the supplied instant.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Number of days in a weekly report.
pub const WEEK_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    /// Local calendar date the window belongs to.
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Local midnight to 23:59:59.999 of `date` in `tz`.
    pub fn full_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let start = local_instant(tz, date, NaiveTime::MIN);
        let last_ms = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        let end = local_instant(tz, date, last_ms);
        Self { date, start, end }
    }

    /// Local midnight of `now`'s date to `now`.
    pub fn today<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let date = now.date_naive();
        let start = local_instant(&tz, date, NaiveTime::MIN);
        Self {
            date,
            start,
            end: now.with_timezone(&Utc),
        }
    }

    /// `days` full-day windows ending with `today`, oldest first.
    pub fn trailing_days<Tz: TimeZone>(today: NaiveDate, days: usize, tz: &Tz) -> Vec<Self> {
        (0..days)
            .rev()
            .map(|back| Self::full_day(today - Duration::days(back as i64), tz))
            .collect()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Resolve a local wall-clock time to UTC. DST folds take the earlier
/// instant; a gap (midnight skipped) falls back to reading the time as UTC.
fn local_instant<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}
