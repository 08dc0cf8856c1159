//! Typed records over the flat key-value store.
//!
//! Each record lives under its own key. Anything that fails to parse is
//! treated as absent and replaced by its default; only store I/O errors are
//! returned.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::KeyValueStore;
use crate::error::{CoreError, StoreError};
use crate::usage::QuotaMap;

pub const QUOTAS_KEY: &str = "selected_victim_apps";
pub const LAST_ACTIVE_DATE_KEY: &str = "last_active_date";
pub const STREAK_KEY: &str = "grass_streak";
pub const LAST_DAY_USAGE_KEY: &str = "last_day_usage_minutes";
pub const ONBOARDING_KEY: &str = "has_completed_onboarding";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted quota map.
pub struct QuotaStore<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> QuotaStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<QuotaMap, StoreError> {
        let Some(raw) = self.store.get(QUOTAS_KEY)? else {
            return Ok(QuotaMap::new());
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(error = %e, "stored quota map is corrupt, treating as empty");
                Ok(QuotaMap::new())
            }
        }
    }

    pub fn save(&self, quotas: &QuotaMap) -> Result<(), CoreError> {
        let json = serde_json::to_string(quotas)?;
        self.store.set(QUOTAS_KEY, &json)?;
        Ok(())
    }

    /// Start tracking a package with `default_minutes` unless already tracked.
    pub fn target(&self, package_id: &str, default_minutes: u32) -> Result<QuotaMap, CoreError> {
        let mut quotas = self.load()?;
        quotas.target_with(package_id, default_minutes)?;
        self.save(&quotas)?;
        Ok(quotas)
    }

    pub fn set_quota(&self, package_id: &str, minutes: u32) -> Result<QuotaMap, CoreError> {
        let mut quotas = self.load()?;
        quotas.set_quota(package_id, minutes)?;
        self.save(&quotas)?;
        Ok(quotas)
    }

    pub fn untarget(&self, package_id: &str) -> Result<QuotaMap, CoreError> {
        let mut quotas = self.load()?;
        if quotas.untarget(package_id).is_some() {
            self.save(&quotas)?;
        }
        Ok(quotas)
    }

    /// Forget every target.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(QUOTAS_KEY)
    }
}

/// Streak fields as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub last_active_date: Option<NaiveDate>,
    pub streak_count: u32,
    /// Usage recorded for `last_active_date`, in minutes.
    pub last_day_usage_minutes: f64,
}

/// Persisted streak record, one key per field.
pub struct StreakStore<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> StreakStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<StreakRecord, StoreError> {
        let last_active_date = self
            .store
            .get(LAST_ACTIVE_DATE_KEY)?
            .and_then(|raw| parse_lenient(LAST_ACTIVE_DATE_KEY, &raw, |s| {
                NaiveDate::parse_from_str(s.trim_matches('"'), DATE_FORMAT).ok()
            }));
        let streak_count = self
            .store
            .get(STREAK_KEY)?
            .and_then(|raw| parse_lenient(STREAK_KEY, &raw, |s| s.parse::<u32>().ok()))
            .unwrap_or(0);
        let last_day_usage_minutes = self
            .store
            .get(LAST_DAY_USAGE_KEY)?
            .and_then(|raw| {
                parse_lenient(LAST_DAY_USAGE_KEY, &raw, |s| {
                    s.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
                })
            })
            .unwrap_or(0.0);

        Ok(StreakRecord {
            last_active_date,
            streak_count,
            last_day_usage_minutes,
        })
    }

    /// Store a recomputed streak.
    ///
    /// The date is written last, so a day only counts as checked in once
    /// both fields landed. A failed date write puts the old count back.
    pub fn save_streak(&self, date: NaiveDate, streak_count: u32) -> Result<(), StoreError> {
        let previous = self.store.get(STREAK_KEY)?;
        self.store.set(STREAK_KEY, &streak_count.to_string())?;
        if let Err(e) = self
            .store
            .set(LAST_ACTIVE_DATE_KEY, &date.format(DATE_FORMAT).to_string())
        {
            let restored = match previous {
                Some(count) => self.store.set(STREAK_KEY, &count),
                None => self.store.remove(STREAK_KEY),
            };
            if let Err(restore) = restored {
                tracing::warn!(error = %restore, "failed to restore streak count");
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn save_last_day_usage(&self, minutes: f64) -> Result<(), StoreError> {
        self.store.set(LAST_DAY_USAGE_KEY, &minutes.to_string())
    }
}

/// Onboarding-completed flag.
pub struct OnboardingFlag;

impl OnboardingFlag {
    pub fn is_completed<S: KeyValueStore + ?Sized>(store: &S) -> Result<bool, StoreError> {
        Ok(store.get(ONBOARDING_KEY)?.as_deref() == Some("true"))
    }

    pub fn mark_completed<S: KeyValueStore + ?Sized>(store: &S) -> Result<(), StoreError> {
        store.set(ONBOARDING_KEY, "true")
    }

    /// Route shown on launch.
    pub fn initial_route<S: KeyValueStore + ?Sized>(
        store: &S,
        home_route: &str,
    ) -> Result<String, StoreError> {
        Ok(if Self::is_completed(store)? {
            home_route.to_string()
        } else {
            "onboarding".to_string()
        })
    }
}

fn parse_lenient<T>(key: &str, raw: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!(key, raw, "ignoring malformed stored value");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::usage::DEFAULT_QUOTA_MINUTES;

    #[test]
    fn missing_quotas_load_empty() {
        let store = MemoryStore::new();
        assert!(QuotaStore::new(&store).load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_quotas_load_empty() {
        let store = MemoryStore::new();
        store.set(QUOTAS_KEY, "{not json").unwrap();
        assert!(QuotaStore::new(&store).load().unwrap().is_empty());
    }

    #[test]
    fn legacy_quotas_migrate_on_load() {
        let store = MemoryStore::new();
        store.set(QUOTAS_KEY, r#"["com.a"]"#).unwrap();
        let quotas = QuotaStore::new(&store).load().unwrap();
        assert_eq!(quotas.quota_minutes("com.a"), DEFAULT_QUOTA_MINUTES);
    }

    #[test]
    fn target_set_untarget_persist() {
        let store = MemoryStore::new();
        let quotas = QuotaStore::new(&store);

        quotas.target("com.a", 60).unwrap();
        quotas.set_quota("com.b", 15).unwrap();
        quotas.untarget("com.a").unwrap();

        let loaded = quotas.load().unwrap();
        assert!(!loaded.is_monitored("com.a"));
        assert_eq!(loaded.quota_minutes("com.b"), 15);
        assert_eq!(store.get(QUOTAS_KEY).unwrap().as_deref(), Some(r#"{"com.b":15}"#));
    }

    #[test]
    fn set_quota_zero_is_rejected_and_not_saved() {
        let store = MemoryStore::new();
        let quotas = QuotaStore::new(&store);
        assert!(quotas.set_quota("com.a", 0).is_err());
        assert!(store.get(QUOTAS_KEY).unwrap().is_none());
    }

    #[test]
    fn streak_record_roundtrip() {
        let store = MemoryStore::new();
        let streaks = StreakStore::new(&store);
        assert_eq!(streaks.load().unwrap(), StreakRecord::default());

        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        streaks.save_streak(date, 3).unwrap();
        streaks.save_last_day_usage(95.5).unwrap();

        let record = streaks.load().unwrap();
        assert_eq!(record.last_active_date, Some(date));
        assert_eq!(record.streak_count, 3);
        assert_eq!(record.last_day_usage_minutes, 95.5);
    }

    #[test]
    fn malformed_streak_fields_fall_back() {
        let store = MemoryStore::new();
        store.set(LAST_ACTIVE_DATE_KEY, "yesterday-ish").unwrap();
        store.set(STREAK_KEY, "many").unwrap();
        store.set(LAST_DAY_USAGE_KEY, "NaN").unwrap();
        assert_eq!(StreakStore::new(&store).load().unwrap(), StreakRecord::default());
    }

    #[test]
    fn onboarding_flag_drives_initial_route() {
        let store = MemoryStore::new();
        assert_eq!(OnboardingFlag::initial_route(&store, "home").unwrap(), "onboarding");
        OnboardingFlag::mark_completed(&store).unwrap();
        assert!(OnboardingFlag::is_completed(&store).unwrap());
        assert_eq!(OnboardingFlag::initial_route(&store, "home").unwrap(), "home");
    }
}
