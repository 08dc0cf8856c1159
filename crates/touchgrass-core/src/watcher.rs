//! Background usage watcher.
//!
//! Polls the usage source on a fixed interval, evaluates the foreground app
//! against its quota and navigates to the lock route on a new violation.
//! Checks run one after another on a single task and never overlap.

use chrono::{DateTime, Local, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::events::Event;
use crate::ports::{Capabilities, Navigator, UsageSource};
use crate::quota::{QuotaEvaluator, ViolationWatch, WatchState};
use crate::storage::{KeyValueStore, QuotaStore, WatcherConfig};
use crate::usage::{DayWindow, QuotaMap};

const EVENT_CAPACITY: usize = 64;

pub struct UsageWatcher<U: UsageSource, S: KeyValueStore + ?Sized> {
    config: WatcherConfig,
    source: Arc<U>,
    store: Arc<S>,
    navigator: Arc<dyn Navigator>,
    evaluator: QuotaEvaluator,
    watch: Mutex<ViolationWatch>,
    events: broadcast::Sender<Event>,
}

impl<U: UsageSource, S: KeyValueStore + ?Sized> UsageWatcher<U, S> {
    pub fn new(config: WatcherConfig, source: Arc<U>, store: Arc<S>, navigator: Arc<dyn Navigator>) -> Self {
        let evaluator = QuotaEvaluator::for_host(config.host_package.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            source,
            store,
            navigator,
            evaluator,
            watch: Mutex::new(ViolationWatch::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Enforcement needs notifications, overlay and usage access, plus at
    /// least one target app.
    pub fn ensure_can_start(&self, capabilities: &Capabilities) -> Result<(), CoreError> {
        let missing = capabilities.missing_for_enforcement();
        if !missing.is_empty() {
            return Err(CoreError::MissingCapabilities { missing });
        }
        if QuotaStore::new(self.store.as_ref()).load()?.tracked().is_empty() {
            return Err(CoreError::NoTargets);
        }
        Ok(())
    }

    pub fn state(&self) -> WatchState {
        self.watch().state().clone()
    }

    pub fn is_locked(&self) -> bool {
        self.watch().is_locked()
    }

    /// Resume watching after the lock screen was dismissed.
    pub fn release(&self) -> Option<Event> {
        let event = self.watch().release(Utc::now())?;
        tracing::info!("lock released, watching resumed");
        self.emit(event.clone());
        Some(event)
    }

    /// Evaluate today's usage up to now.
    pub async fn check_once(&self) -> Vec<Event> {
        let now = Local::now();
        self.check_at(DayWindow::today(&now), now.with_timezone(&Utc)).await
    }

    /// Evaluate usage in `window` and request a lock on a new violation.
    ///
    /// Source and store failures are logged and produce no decision.
    pub async fn check_at(&self, window: DayWindow, at: DateTime<Utc>) -> Vec<Event> {
        let quotas = self.load_quotas();
        if quotas.tracked().is_empty() {
            return Vec::new();
        }

        let samples = match self.source.query_usage(window).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(error = %e, "usage query failed, skipping check");
                return Vec::new();
            }
        };

        let evaluation = self.evaluator.evaluate(&samples, &quotas);
        tracing::debug!(
            package = evaluation.top_package_id.as_deref().unwrap_or("-"),
            used_minutes = evaluation.used_minutes,
            violated = evaluation.violated,
            "usage checked"
        );

        let events = self.watch().observe(&evaluation, &quotas, at);
        if !events.is_empty() {
            if let Some(package) = evaluation.top_package_id.as_deref() {
                tracing::info!(
                    package,
                    used_minutes = evaluation.used_minutes,
                    quota_minutes = quotas.quota_minutes(package),
                    "quota exceeded, requesting lock"
                );
            }
            self.navigator.navigate_to(&self.config.lock_route);
            for event in &events {
                self.emit(event.clone());
            }
        }
        events
    }

    /// Poll until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = Duration::from_secs(self.config.poll_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(poll_interval_secs = period.as_secs(), "usage watcher started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_once().await;
                }
                _ = cancel.cancelled() => {
                    tracing::info!("usage watcher shutting down");
                    break;
                }
            }
        }
    }

    fn load_quotas(&self) -> QuotaMap {
        match QuotaStore::new(self.store.as_ref()).load() {
            Ok(quotas) => quotas,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load quotas, skipping check");
                QuotaMap::new()
            }
        }
    }

    fn watch(&self) -> MutexGuard<'_, ViolationWatch> {
        self.watch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UsageError;
    use crate::storage::MemoryStore;
    use crate::usage::UsageSample;
    use chrono::{NaiveDate, TimeZone};
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedUsage {
        samples: Mutex<Result<Vec<UsageSample>, UsageError>>,
        queries: AtomicUsize,
    }

    impl ScriptedUsage {
        fn new(samples: Vec<UsageSample>) -> Self {
            Self {
                samples: Mutex::new(Ok(samples)),
                queries: AtomicUsize::new(0),
            }
        }

        fn set(&self, result: Result<Vec<UsageSample>, UsageError>) {
            *self.samples.lock().unwrap() = result;
        }
    }

    impl UsageSource for ScriptedUsage {
        fn query_usage(
            &self,
            _window: DayWindow,
        ) -> impl Future<Output = Result<Vec<UsageSample>, UsageError>> + Send {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let result = self.samples.lock().unwrap().clone();
            async move { result }
        }
    }

    #[derive(Default)]
    struct Routes(Mutex<Vec<String>>);

    impl Navigator for Routes {
        fn navigate_to(&self, route: &str) {
            self.0.lock().unwrap().push(route.to_string());
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap()
    }

    fn window() -> DayWindow {
        DayWindow::today(&at())
    }

    fn sample(pkg: &str, minutes: u64) -> UsageSample {
        UsageSample::new(pkg, at() - chrono::Duration::minutes(1), minutes * 60_000)
    }

    fn setup(
        samples: Vec<UsageSample>,
        quotas: &[(&str, u32)],
    ) -> (UsageWatcher<ScriptedUsage, MemoryStore>, Arc<ScriptedUsage>, Arc<Routes>) {
        let store = Arc::new(MemoryStore::new());
        for (pkg, minutes) in quotas {
            QuotaStore::new(store.as_ref()).set_quota(pkg, *minutes).unwrap();
        }
        let source = Arc::new(ScriptedUsage::new(samples));
        let routes = Arc::new(Routes::default());
        let watcher = UsageWatcher::new(WatcherConfig::default(), source.clone(), store, routes.clone());
        (watcher, source, routes)
    }

    #[tokio::test]
    async fn violation_navigates_to_lock_once() {
        let (watcher, _source, routes) = setup(vec![sample("com.x", 61)], &[("com.x", 60)]);

        let events = watcher.check_at(window(), at()).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            Event::QuotaViolated { package_id, used_minutes: 61, quota_minutes: 60, .. } if package_id == "com.x"
        ));
        assert!(watcher.is_locked());

        // Still over quota: no second lock request
        assert!(watcher.check_at(window(), at()).await.is_empty());
        assert_eq!(*routes.0.lock().unwrap(), vec!["locked".to_string()]);

        assert!(matches!(watcher.release(), Some(Event::LockReleased { .. })));
        assert!(watcher.release().is_none());
        assert_eq!(watcher.check_at(window(), at()).await.len(), 2);
    }

    #[tokio::test]
    async fn under_quota_does_nothing() {
        let (watcher, _source, routes) = setup(vec![sample("com.x", 59)], &[("com.x", 60)]);
        assert!(watcher.check_at(window(), at()).await.is_empty());
        assert!(routes.0.lock().unwrap().is_empty());
        assert_eq!(watcher.state(), WatchState::Watching);
    }

    #[tokio::test]
    async fn host_app_in_front_is_ignored() {
        let (watcher, _source, routes) = setup(
            vec![sample("com.x", 120), UsageSample::new("com.t3mpest.touchgrass", at(), 60_000)],
            &[("com.x", 60)],
        );
        assert!(watcher.check_at(window(), at()).await.is_empty());
        assert!(routes.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_targets_skips_query() {
        let (watcher, source, _routes) = setup(vec![sample("com.x", 500)], &[]);
        assert!(watcher.check_at(window(), at()).await.is_empty());
        assert_eq!(source.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn permission_denied_fails_closed() {
        let (watcher, source, routes) = setup(vec![], &[("com.x", 1)]);
        source.set(Err(UsageError::PermissionDenied));
        assert!(watcher.check_at(window(), at()).await.is_empty());
        assert!(routes.0.lock().unwrap().is_empty());
    }

    #[test]
    fn start_requires_capabilities_and_targets() {
        let (watcher, _source, _routes) = setup(vec![], &[]);
        let all = Capabilities {
            usage_stats: true,
            overlay: true,
            notifications: true,
            battery_unrestricted: false,
        };

        let err = watcher.ensure_can_start(&Capabilities::default()).unwrap_err();
        assert!(matches!(err, CoreError::MissingCapabilities { ref missing } if missing.len() == 3));
        assert!(matches!(watcher.ensure_can_start(&all), Err(CoreError::NoTargets)));

        let (watcher, _source, _routes) = setup(vec![], &[("com.x", 5)]);
        assert!(watcher.ensure_can_start(&all).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_on_interval_until_cancelled() {
        let (watcher, source, _routes) = setup(vec![sample("com.x", 1)], &[("com.x", 60)]);
        let watcher = Arc::new(watcher);
        let cancel = CancellationToken::new();

        let task = {
            let watcher = watcher.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { watcher.run(cancel).await })
        };

        // First tick is immediate, then every 20s
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(source.queries.load(Ordering::SeqCst), 3);

        cancel.cancel();
        task.await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.queries.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn window_for_today_starts_at_midnight() {
        let w = window();
        assert_eq!(w.date, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(w.end, at());
    }
}
