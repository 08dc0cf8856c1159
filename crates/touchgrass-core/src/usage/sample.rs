//! Usage samples and the user's quota map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ValidationError;

/// Quota assigned when a package is first targeted.
pub const DEFAULT_QUOTA_MINUTES: u32 = 60;

const MS_PER_MINUTE: u64 = 60_000;

/// Packages that count toward breakdowns and weekly totals.
pub type TrackedSet = BTreeSet<String>;

/// One record per application for a query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSample {
    pub package_id: String,
    /// Instant the app was last frontmost.
    pub last_foreground: DateTime<Utc>,
    /// Cumulative foreground time within the query window.
    pub foreground_duration_ms: u64,
}

impl UsageSample {
    pub fn new(
        package_id: impl Into<String>,
        last_foreground: DateTime<Utc>,
        foreground_duration_ms: u64,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            last_foreground,
            foreground_duration_ms,
        }
    }

    /// Whole minutes of foreground time (truncating).
    pub fn used_minutes(&self) -> u64 {
        self.foreground_duration_ms / MS_PER_MINUTE
    }

    /// Fractional minutes, for display statistics.
    pub fn minutes(&self) -> f64 {
        self.foreground_duration_ms as f64 / MS_PER_MINUTE as f64
    }
}

/// Package id to daily quota in minutes.
///
/// Absent packages are not monitored, and neither are packages with a quota
/// of zero. Deserializes from either the current object form
/// (`{"com.x": 45}`) or the legacy array of package ids, which maps every
/// listed package to [`DEFAULT_QUOTA_MINUTES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "QuotaRepr")]
pub struct QuotaMap(BTreeMap<String, u32>);

#[derive(Deserialize)]
#[serde(untagged)]
enum QuotaRepr {
    Current(BTreeMap<String, u32>),
    Legacy(Vec<String>),
}

impl From<QuotaRepr> for QuotaMap {
    fn from(repr: QuotaRepr) -> Self {
        match repr {
            QuotaRepr::Current(map) => QuotaMap(map),
            QuotaRepr::Legacy(packages) => QuotaMap(
                packages
                    .into_iter()
                    .map(|pkg| (pkg, DEFAULT_QUOTA_MINUTES))
                    .collect(),
            ),
        }
    }
}

impl QuotaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quota for a package; 0 when absent.
    pub fn quota_minutes(&self, package_id: &str) -> u32 {
        self.0.get(package_id).copied().unwrap_or(0)
    }

    pub fn is_monitored(&self, package_id: &str) -> bool {
        self.quota_minutes(package_id) > 0
    }

    /// Add a package with the default quota. Existing quotas are kept.
    pub fn target(&mut self, package_id: &str) -> Result<u32, ValidationError> {
        self.target_with(package_id, DEFAULT_QUOTA_MINUTES)
    }

    /// Add a package with the given starting quota. Existing quotas are kept.
    pub fn target_with(
        &mut self,
        package_id: &str,
        default_minutes: u32,
    ) -> Result<u32, ValidationError> {
        validate_package(package_id)?;
        if default_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "default_quota_minutes".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(*self
            .0
            .entry(package_id.to_string())
            .or_insert(default_minutes))
    }

    /// Set the quota for a package. Zero is rejected; use [`Self::untarget`].
    pub fn set_quota(&mut self, package_id: &str, minutes: u32) -> Result<(), ValidationError> {
        validate_package(package_id)?;
        if minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "quota_minutes".into(),
                message: "must be greater than zero".into(),
            });
        }
        self.0.insert(package_id.to_string(), minutes);
        Ok(())
    }

    /// Remove a package. Returns the quota it had.
    pub fn untarget(&mut self, package_id: &str) -> Option<u32> {
        self.0.remove(package_id)
    }

    /// Monitored packages (quota > 0).
    pub fn tracked(&self) -> TrackedSet {
        self.0
            .iter()
            .filter(|(_, minutes)| **minutes > 0)
            .map(|(pkg, _)| pkg.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(pkg, &minutes)| (pkg.as_str(), minutes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, u32)> for QuotaMap {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        QuotaMap(iter.into_iter().collect())
    }
}

fn validate_package(package_id: &str) -> Result<(), ValidationError> {
    if package_id.trim().is_empty() {
        return Err(ValidationError::Empty("package_id".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_minutes_truncates() {
        let sample = UsageSample::new("com.x", Utc::now(), 61 * 60_000 + 59_999);
        assert_eq!(sample.used_minutes(), 61);
        assert!(sample.minutes() > 61.99);
    }

    #[test]
    fn quota_map_parses_object_form() {
        let map: QuotaMap = serde_json::from_str(r#"{"com.x": 45, "com.y": 0}"#).unwrap();
        assert_eq!(map.quota_minutes("com.x"), 45);
        assert!(!map.is_monitored("com.y"));
        assert_eq!(map.tracked().len(), 1);
    }

    #[test]
    fn quota_map_migrates_legacy_array() {
        let map: QuotaMap = serde_json::from_str(r#"["com.a", "com.b"]"#).unwrap();
        assert_eq!(map.quota_minutes("com.a"), DEFAULT_QUOTA_MINUTES);
        assert_eq!(map.quota_minutes("com.b"), DEFAULT_QUOTA_MINUTES);
    }

    #[test]
    fn quota_map_serializes_as_plain_object() {
        let mut map = QuotaMap::new();
        map.set_quota("com.x", 30).unwrap();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"com.x":30}"#);
    }

    #[test]
    fn target_keeps_existing_quota() {
        let mut map = QuotaMap::new();
        map.set_quota("com.x", 15).unwrap();
        assert_eq!(map.target("com.x").unwrap(), 15);
        assert_eq!(map.target("com.y").unwrap(), DEFAULT_QUOTA_MINUTES);
    }

    #[test]
    fn set_quota_rejects_zero_and_blank() {
        let mut map = QuotaMap::new();
        assert!(map.set_quota("com.x", 0).is_err());
        assert!(map.set_quota("  ", 10).is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn untarget_removes_entry() {
        let mut map = QuotaMap::new();
        map.target("com.x").unwrap();
        assert_eq!(map.untarget("com.x"), Some(DEFAULT_QUOTA_MINUTES));
        assert!(!map.is_monitored("com.x"));
        assert_eq!(map.untarget("com.x"), None);
    }
}
