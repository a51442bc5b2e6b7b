//! Alert refresh engine.
//!
//! Fetches the alert list, replaces the snapshot wholesale, and notifies on
//! alerts that newly appeared since the previous snapshot. Failed fetches
//! retry with capped exponential backoff; exhausting the cap surfaces a
//! persistent "showing cached data" error and halts automatic retry until
//! the next external trigger.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use beacon_api::{ApiClient, fetch_alerts};
use beacon_core::{Alert, AlertCacheRepository, AlertSnapshot};

use crate::notify::Notifier;
use crate::schedule::{ScheduledTask, schedule};

/// User-visible error once automatic retry is exhausted.
pub const REFRESH_ERROR_MESSAGE: &str = "Unable to refresh alerts. Showing last known data.";

/// Retry tuning for failed fetches.
#[derive(Debug, Clone, Copy)]
pub struct RefreshConfig {
    /// First retry delay; attempt `n` waits `base_delay * 2^n`.
    pub base_delay: Duration,
    /// Scheduled retries per failure streak before giving up.
    pub max_retries: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1500),
            max_retries: 3,
        }
    }
}

impl RefreshConfig {
    /// Delay before the retry following failure number `attempt`
    /// (zero-based): `base, 2*base, 4*base, ...`.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Read-only view of the engine for display layers.
#[derive(Debug, Clone, Default)]
pub struct AlertStatus {
    /// Alerts ordered for display (severity rank, then recency).
    pub alerts: Vec<Alert>,
    /// When the list was last refreshed successfully.
    pub last_updated: Option<chrono::DateTime<Utc>>,
    /// A non-silent refresh is in flight.
    pub loading: bool,
    /// Persistent error after retry exhaustion, if any.
    pub error: Option<String>,
    /// Failures in the current retry streak.
    pub retry_count: u32,
}

struct RefreshState {
    snapshot: AlertSnapshot,
    loading: bool,
    error: Option<String>,
    retry_count: u32,
    retry_task: Option<ScheduledTask>,
}

/// Owns the alert snapshot and the refresh/backoff lifecycle.
///
/// Constructed behind an [`Arc`]: backoff retries re-enter the engine from
/// a scheduled task, which needs an owning handle.
pub struct AlertRefreshEngine {
    client: ApiClient,
    cache: AlertCacheRepository,
    notifier: Arc<dyn Notifier>,
    config: RefreshConfig,
    state: Mutex<RefreshState>,
    fetch_gate: Mutex<()>,
    this: Weak<Self>,
}

impl AlertRefreshEngine {
    /// Creates an engine with default retry tuning.
    #[must_use]
    pub fn new(
        client: ApiClient,
        cache: AlertCacheRepository,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Self::with_config(client, cache, notifier, RefreshConfig::default())
    }

    /// Creates an engine with explicit retry tuning.
    #[must_use]
    pub fn with_config(
        client: ApiClient,
        cache: AlertCacheRepository,
        notifier: Arc<dyn Notifier>,
        config: RefreshConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            client,
            cache,
            notifier,
            config,
            state: Mutex::new(RefreshState {
                snapshot: AlertSnapshot::default(),
                loading: false,
                error: None,
                retry_count: 0,
                retry_task: None,
            }),
            fetch_gate: Mutex::new(()),
            this: this.clone(),
        })
    }

    /// Prime the snapshot from the persisted cache, then fetch.
    ///
    /// The cached list is shown immediately and doubles as the diff
    /// baseline, so an alert already seen in a previous session never
    /// re-notifies.
    pub async fn init(&self) {
        match self.cache.load().await {
            Ok(Some(cached)) => {
                info!("primed {} cached alert(s)", cached.alerts.len());
                self.state.lock().await.snapshot = cached;
            }
            Ok(None) => {}
            Err(e) => warn!("failed to load alert cache: {e}"),
        }

        self.refresh(false).await;
    }

    /// Fetch the alert list and reconcile the snapshot.
    ///
    /// A single fetch is in flight system-wide; re-entrant calls are
    /// no-ops. `silent` refreshes never drive the `loading` flag and are
    /// used for background and backoff-scheduled attempts.
    pub async fn refresh(&self, silent: bool) {
        let Ok(_guard) = self.fetch_gate.try_lock() else {
            debug!("refresh already in flight");
            return;
        };

        let attempt = {
            let mut state = self.state.lock().await;
            if !silent {
                state.loading = true;
                state.error = None;
            }
            state.retry_count
        };

        match fetch_alerts(&self.client).await {
            Ok(alerts) => self.apply_fetched(alerts).await,
            Err(e) => {
                warn!("alert refresh failed: {e}");
                self.handle_retry(attempt).await;
            }
        }
    }

    /// Current state for display layers.
    pub async fn status(&self) -> AlertStatus {
        let state = self.state.lock().await;
        AlertStatus {
            alerts: state.snapshot.display_order(),
            last_updated: state.snapshot.last_updated,
            loading: state.loading,
            error: state.error.clone(),
            retry_count: state.retry_count,
        }
    }

    async fn apply_fetched(&self, alerts: Vec<Alert>) {
        let now = Utc::now();

        {
            let mut state = self.state.lock().await;

            let fresh: Vec<Alert> = state
                .snapshot
                .newly_arrived(&alerts)
                .into_iter()
                .cloned()
                .collect();
            for alert in &fresh {
                if alert.severity.is_notifiable() {
                    let title =
                        format!("{}: {}", alert.severity.label().to_uppercase(), alert.title);
                    let body = format!("{} - {}", alert.location, alert.kind);
                    self.notifier.notify(&title, &body, &alert.id);
                }
            }

            state.snapshot = AlertSnapshot::new(alerts.clone(), now);
            state.loading = false;
            state.error = None;
            state.retry_count = 0;
            if let Some(task) = state.retry_task.take() {
                task.cancel();
            }
        }

        if let Err(e) = self.cache.save(&alerts, now).await {
            warn!("failed to persist alert cache: {e}");
        }
    }

    // Boxed to anchor a concrete `Send` future type: the retry path is
    // recursive (`refresh` -> `handle_retry` -> `schedule` -> `refresh`), and
    // rustc cannot infer `Send` across that opaque-future cycle without an
    // explicit boxed boundary here.
    fn handle_retry(
        &self,
        attempt: u32,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let next_attempt = attempt + 1;
            let mut state = self.state.lock().await;
            state.loading = false;

            if next_attempt <= self.config.max_retries {
                let Some(engine) = self.this.upgrade() else {
                    return;
                };
                let delay = self.config.retry_delay(attempt);
                debug!("scheduling alert retry {next_attempt} in {delay:?}");
                state.retry_count = next_attempt;

                state.retry_task = Some(schedule(delay, async move {
                    // Clear the stored handle before re-entering refresh so a
                    // success can never cancel the very task it is running on.
                    engine.state.lock().await.retry_task = None;
                    engine.refresh(true).await;
                }));
            } else {
                state.retry_count = 0;
                state.error = Some(REFRESH_ERROR_MESSAGE.to_string());
                warn!("alert refresh retries exhausted, showing cached data");
            }
        })
    }
}

impl std::fmt::Debug for AlertRefreshEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertRefreshEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use beacon_api::StaticToken;
    use std::sync::Mutex as StdMutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingNotifier {
        seen: StdMutex<Vec<(String, String, String)>>,
    }

    impl RecordingNotifier {
        fn alert_ids(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|(_, _, id)| id.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str, alert_id: &str) {
            self.seen.lock().unwrap().push((
                title.to_string(),
                body.to_string(),
                alert_id.to_string(),
            ));
        }
    }

    fn alert_json(id: &str, severity: &str) -> serde_json::Value {
        serde_json::json!({
            "_id": id,
            "type": "flood",
            "title": format!("Alert {id}"),
            "description": "",
            "location": "Riverside",
            "severity": severity,
            "createdAt": "2026-08-01T10:00:00Z",
            "updatedAt": "2026-08-01T10:00:00Z",
        })
    }

    async fn engine_with(
        server: &MockServer,
        config: RefreshConfig,
    ) -> (Arc<AlertRefreshEngine>, Arc<RecordingNotifier>) {
        let cache = AlertCacheRepository::in_memory().await.unwrap();
        let client = ApiClient::new(server.uri(), Arc::new(StaticToken::anonymous())).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = AlertRefreshEngine::with_config(
            client,
            cache,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            config,
        );
        (engine, notifier)
    }

    fn fast_config() -> RefreshConfig {
        RefreshConfig {
            base_delay: Duration::from_millis(10),
            max_retries: 3,
        }
    }

    async fn mount_alerts(server: &MockServer, alerts: Vec<serde_json::Value>) {
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(alerts))
            .mount(server)
            .await;
    }

    #[test]
    fn test_backoff_ladder() {
        let config = RefreshConfig {
            base_delay: Duration::from_millis(1500),
            max_retries: 3,
        };
        assert_eq!(config.retry_delay(0), Duration::from_millis(1500));
        assert_eq!(config.retry_delay(1), Duration::from_millis(3000));
        assert_eq!(config.retry_delay(2), Duration::from_millis(6000));
    }

    #[tokio::test]
    async fn test_first_fetch_establishes_baseline_without_notifying() {
        let server = MockServer::start().await;
        mount_alerts(&server, vec![alert_json("a", "critical")]).await;

        let (engine, notifier) = engine_with(&server, fast_config()).await;
        engine.refresh(false).await;

        let status = engine.status().await;
        assert_eq!(status.alerts.len(), 1);
        assert!(status.error.is_none());
        assert!(notifier.alert_ids().is_empty());
    }

    #[tokio::test]
    async fn test_new_high_severity_alert_notifies_exactly_once() {
        let server = MockServer::start().await;
        mount_alerts(
            &server,
            vec![alert_json("a", "critical"), alert_json("b", "low")],
        )
        .await;

        let (engine, notifier) = engine_with(&server, fast_config()).await;
        engine.refresh(false).await;

        mount_alerts(
            &server,
            vec![
                alert_json("a", "critical"),
                alert_json("b", "low"),
                alert_json("c", "high"),
                alert_json("d", "medium"),
            ],
        )
        .await;
        engine.refresh(false).await;

        // Only the newly arrived high-severity alert notified.
        assert_eq!(notifier.alert_ids(), vec!["c".to_string()]);

        // Refreshing the same set again notifies nothing.
        engine.refresh(false).await;
        assert_eq!(notifier.alert_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_alerts_do_not_renotify_after_restart() {
        let server = MockServer::start().await;
        mount_alerts(&server, vec![alert_json("a", "critical")]).await;

        let cache = AlertCacheRepository::in_memory().await.unwrap();
        let client = ApiClient::new(server.uri(), Arc::new(StaticToken::anonymous())).unwrap();

        // First session fetches and persists the snapshot.
        {
            let notifier = Arc::new(RecordingNotifier::default());
            let engine = AlertRefreshEngine::with_config(
                client.clone(),
                AlertCacheRepository::in_memory().await.unwrap(),
                Arc::clone(&notifier) as Arc<dyn Notifier>,
                fast_config(),
            );
            engine.init().await;
            // Keep the shared cache in sync with what the engine saw.
            cache
                .save(&engine.status().await.alerts, Utc::now())
                .await
                .unwrap();
        }

        // Second session primes from the cache; the same alert is old news.
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = AlertRefreshEngine::with_config(
            client,
            cache,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            fast_config(),
        );
        engine.init().await;

        assert!(notifier.alert_ids().is_empty());
        assert_eq!(engine.status().await.alerts.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_surfaces_cached_data_error() {
        let server = MockServer::start().await;

        // Establish a baseline, then break the endpoint.
        mount_alerts(&server, vec![alert_json("a", "high")]).await;
        let (engine, _notifier) = engine_with(&server, fast_config()).await;
        engine.refresh(false).await;

        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api/alerts"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        engine.refresh(false).await;

        // Scheduled silent retries run on their own; poll until the streak
        // is exhausted (3 retries at 10/20/40ms).
        let mut waited = Duration::ZERO;
        loop {
            let status = engine.status().await;
            if status.error.is_some() {
                assert_eq!(status.error.as_deref(), Some(REFRESH_ERROR_MESSAGE));
                assert_eq!(status.retry_count, 0);
                // The cached list from the successful fetch is still shown.
                assert_eq!(status.alerts.len(), 1);
                break;
            }
            assert!(waited < Duration::from_secs(5), "retries never exhausted");
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += Duration::from_millis(20);
        }

        // No further automatic retry: the streak is over until an external
        // trigger refreshes again.
        let status_before = engine.status().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.status().await.error, status_before.error);
    }

    #[tokio::test]
    async fn test_successful_refresh_clears_error_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/alerts"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = RefreshConfig {
            base_delay: Duration::from_millis(10),
            max_retries: 0,
        };
        let (engine, _notifier) = engine_with(&server, config).await;

        engine.refresh(false).await;
        assert!(engine.status().await.error.is_some());

        mount_alerts(&server, vec![alert_json("a", "low")]).await;
        engine.refresh(false).await;

        let status = engine.status().await;
        assert!(status.error.is_none());
        assert_eq!(status.alerts.len(), 1);
        assert!(status.last_updated.is_some());
    }
}
