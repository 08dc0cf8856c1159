//! Integration tests for the enforcement loop.
//!
//! Covers the full path from usage samples to a lock request, the presence
//! ritual that dismisses it, and the streak check-in that follows.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use touchgrass_core::storage::GateConfig;
use touchgrass_core::{
    Capabilities, Config, Database, DayWindow, Event, GateState, HapticEmitter, HapticPulse,
    KeyValueStore, LockSession, Navigator, QuotaEvaluator, QuotaMap, QuotaStore, SensorError,
    SensorKind, SensorReading, SensorSource, SensorSubscription, StreakTracker, UsageError,
    UsageSample, UsageSource, UsageWatcher,
};

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

struct StaticUsage(Vec<UsageSample>);

impl UsageSource for StaticUsage {
    fn query_usage(
        &self,
        _window: DayWindow,
    ) -> impl Future<Output = Result<Vec<UsageSample>, UsageError>> + Send {
        let samples = self.0.clone();
        async move { Ok(samples) }
    }
}

#[derive(Default)]
struct Screen {
    routes: Mutex<Vec<String>>,
    pulses: Mutex<Vec<HapticPulse>>,
}

impl Navigator for Screen {
    fn navigate_to(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

impl HapticEmitter for Screen {
    fn pulse(&self, pulse: HapticPulse) {
        self.pulses.lock().unwrap().push(pulse);
    }
}

/// Light sensor that reports one fixed reading; no accelerometer.
struct SunnyDay {
    lux: f64,
}

impl SensorSource for SunnyDay {
    fn subscribe(&self, kind: SensorKind, _interval_ms: u64) -> Result<SensorSubscription, SensorError> {
        match kind {
            SensorKind::Light => {
                let (tx, rx) = mpsc::channel(1);
                tx.try_send(SensorReading::Light { lux: self.lux })
                    .expect("fresh channel has room");
                // Keep the sender alive for the subscription's lifetime
                Ok(SensorSubscription::new(kind, rx).with_unsubscribe(move || drop(tx)))
            }
            SensorKind::Motion => Err(SensorError::Unavailable(kind)),
        }
    }
}

#[test]
fn evaluator_scenarios() {
    let evaluator = QuotaEvaluator::new();
    let samples = vec![UsageSample::new("com.x", noon(), 61 * 60_000)];

    assert!(evaluator.current_foreground_app(&[]).is_none());

    let quotas: QuotaMap = [("com.x".to_string(), 60)].into_iter().collect();
    let evaluation = evaluator.evaluate(&samples, &quotas);
    assert_eq!(evaluation.top_package_id.as_deref(), Some("com.x"));
    assert_eq!(evaluation.used_minutes, 61);
    assert!(evaluation.violated);

    assert!(!evaluator.evaluate(&samples, &QuotaMap::new()).violated);
}

#[test]
fn weekly_totals_over_seven_days() {
    let tracked = ["com.x".to_string()].into_iter().collect();
    let days: Vec<Vec<UsageSample>> = (0..7)
        .map(|d| vec![UsageSample::new("com.x", noon() - Duration::days(6 - d), 30 * 60_000)])
        .collect();
    assert_eq!(touchgrass_core::quota::weekly_totals(&days, &tracked), [30.0; 7]);
}

#[tokio::test(start_paused = true)]
async fn violation_lock_and_sunlit_unlock() {
    let store = Arc::new(Database::open_memory().unwrap());
    QuotaStore::new(store.as_ref()).target("com.x", 60).unwrap();

    let config = Config::default();
    let screen = Arc::new(Screen::default());
    let usage = Arc::new(StaticUsage(vec![
        UsageSample::new("com.x", noon(), 75 * 60_000),
        UsageSample::new("com.y", noon() - Duration::minutes(5), 200 * 60_000),
    ]));
    let watcher = UsageWatcher::new(config.watcher.clone(), usage, store.clone(), screen.clone());

    let all = Capabilities {
        usage_stats: true,
        overlay: true,
        notifications: true,
        battery_unrestricted: true,
    };
    watcher.ensure_can_start(&all).unwrap();

    let events = watcher.check_at(DayWindow::today(&noon()), noon()).await;
    assert!(matches!(events.last(), Some(Event::LockRequested { package_id, .. }) if package_id == "com.x"));
    assert_eq!(screen.routes.lock().unwrap().last().map(String::as_str), Some("locked"));

    // The lock screen
    let session = LockSession::start(
        config.gate.clone(),
        13,
        &SunnyDay { lux: 12_000.0 },
        screen.clone(),
        screen.clone(),
        config.watcher.home_route.clone(),
    );
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    assert!(session.snapshot().sun_verified);

    let snapshot = session.press_start();
    assert_eq!(snapshot.required_hold_ms, 3000);
    tokio::time::sleep(std::time::Duration::from_millis(3050)).await;
    assert_eq!(session.snapshot().state, GateState::Unlocked);
    assert_eq!(screen.routes.lock().unwrap().last().map(String::as_str), Some("home"));
    assert_eq!(screen.pulses.lock().unwrap().last(), Some(&HapticPulse::Success));
    session.close().await;

    assert!(watcher.release().is_some());
    assert!(!watcher.is_locked());
}

#[tokio::test(start_paused = true)]
async fn overcast_stillness_never_unlocks() {
    let screen = Arc::new(Screen::default());
    let session = LockSession::start(
        GateConfig::default(),
        10,
        &SunnyDay { lux: 100.0 },
        screen.clone(),
        screen.clone(),
        "home",
    );

    for _ in 0..3 {
        session.press_start();
        tokio::time::sleep(std::time::Duration::from_millis(5100)).await;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, GateState::Idle);
        assert_eq!(snapshot.progress, 0.0);
    }
    assert!(screen.routes.lock().unwrap().is_empty());
    session.close().await;
}

#[test]
fn streak_over_a_week_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("touchgrass.db");
    let first = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

    for (offset, minutes) in [(0, 30.0), (1, 100.0), (2, 250.0), (3, 10.0)] {
        let db = Database::open_at(&path).unwrap();
        let tracker = StreakTracker::new(&db, Default::default());
        tracker.check_in(first + Duration::days(offset), minutes).unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let record = StreakTracker::new(&db, Default::default()).current().unwrap();
    // Day 3 followed a 250-minute day
    assert_eq!(record.streak_count, 0);
    assert_eq!(record.last_active_date, Some(first + Duration::days(3)));
    assert_eq!(db.get("grass_streak").unwrap().as_deref(), Some("0"));
}
