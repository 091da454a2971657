// tests/monitor_selfheal.rs
//! Monitor behavior: status transitions drive exactly one forced refresh,
//! recovery is observable, and remediations are recorded.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use trending_aggregator::trending::aggregator::{Aggregator, AggregatorConfig};
use trending_aggregator::trending::error::ProviderError;
use trending_aggregator::trending::types::{
    HealthThresholds, SourceDescriptor, TrendSource, TrendingItem,
};
use trending_aggregator::trending::RoundRobinRanker;
use trending_aggregator::{HealthMonitor, HealthStatus, TrendCache};

fn item(source: &str, id: &str) -> TrendingItem {
    TrendingItem {
        source_id: source.to_string(),
        external_id: id.to_string(),
        title: id.to_string(),
        url: format!("https://example.com/{source}/{id}"),
        score: 1.0,
        fetched_at: Utc::now(),
    }
}

struct FlakySource {
    id: &'static str,
    fail: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TrendSource for FlakySource {
    async fn fetch(
        &self,
        _limit: usize,
        _timeout: Duration,
    ) -> Result<Vec<TrendingItem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("flaky".to_string()));
        }
        Ok(vec![item(self.id, "x1")])
    }

    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        self.id
    }
}

struct Rig {
    cache: Arc<TrendCache>,
    monitor: HealthMonitor,
    flaky_fail: Arc<AtomicBool>,
    flaky_calls: Arc<AtomicUsize>,
}

/// Two sources: "steady" always succeeds, "flaky" is switchable. Scheduled
/// refreshes therefore keep succeeding while the flaky streak builds.
fn rig() -> Rig {
    let flaky_fail = Arc::new(AtomicBool::new(false));
    let flaky_calls = Arc::new(AtomicUsize::new(0));

    let steady = Arc::new(FlakySource {
        id: "steady",
        fail: Arc::new(AtomicBool::new(false)),
        calls: Arc::new(AtomicUsize::new(0)),
    });
    let flaky = Arc::new(FlakySource {
        id: "flaky",
        fail: Arc::clone(&flaky_fail),
        calls: Arc::clone(&flaky_calls),
    });

    let descriptors: Vec<SourceDescriptor> = ["steady", "flaky"]
        .iter()
        .map(|id| SourceDescriptor {
            id: id.to_string(),
            display_name: id.to_string(),
            enabled: true,
            weight: 1.0,
        })
        .collect();

    let aggregator = Aggregator::new(
        vec![steady, flaky],
        &descriptors,
        Box::new(RoundRobinRanker),
        AggregatorConfig {
            per_source_limit: 10,
            overall_limit: 100,
            timeout: Duration::from_secs(5),
            thresholds: HealthThresholds {
                unhealthy_after: 3,
                stale_after: Duration::from_secs(600),
            },
        },
    );
    let cache = Arc::new(TrendCache::new(aggregator));
    let monitor = HealthMonitor::new(Arc::clone(&cache));
    Rig {
        cache,
        monitor,
        flaky_fail,
        flaky_calls,
    }
}

#[tokio::test]
async fn healthy_sources_trigger_no_remediation() {
    let rig = rig();
    rig.cache.refresh_now().await.expect("prime");

    assert!(rig.monitor.tick().await.is_none());
    assert_eq!(rig.monitor.forced_refresh_count(), 0);
}

#[tokio::test]
async fn unhealthy_transition_forces_refresh_ahead_of_timer() {
    let rig = rig();
    rig.cache.refresh_now().await.expect("prime");

    // Build the failure streak up to the threshold via scheduled-style
    // refreshes (the steady source keeps those succeeding).
    rig.flaky_fail.store(true, Ordering::SeqCst);
    for _ in 0..3 {
        rig.cache.refresh_now().await.expect("partial refresh");
    }
    assert_eq!(
        rig.cache.read_source_health()["flaky"].status,
        HealthStatus::Unhealthy
    );

    // The provider recovers; no timer tick happens. The monitor alone
    // must drive the recovery refresh.
    rig.flaky_fail.store(false, Ordering::SeqCst);
    let calls_before = rig.flaky_calls.load(Ordering::SeqCst);

    let event = rig.monitor.tick().await.expect("remediation taken");
    assert_eq!(event.sources, vec!["flaky".to_string()]);
    assert!(event.refresh_ok);
    assert_eq!(rig.monitor.forced_refresh_count(), 1);
    assert_eq!(rig.flaky_calls.load(Ordering::SeqCst), calls_before + 1);

    // Self-healed: streak reset, both sources back in the snapshot.
    let health = rig.cache.read_source_health();
    assert_eq!(health["flaky"].consecutive_failures, 0);
    assert_eq!(health["flaky"].status, HealthStatus::Healthy);
    let sources: Vec<String> = rig
        .cache
        .read(10)
        .expect("populated")
        .into_iter()
        .map(|i| i.source_id)
        .collect();
    assert!(sources.contains(&"flaky".to_string()));
}

#[tokio::test]
async fn sustained_unhealthiness_is_remediated_once_per_transition() {
    let rig = rig();
    rig.cache.refresh_now().await.expect("prime");

    rig.flaky_fail.store(true, Ordering::SeqCst);
    for _ in 0..3 {
        rig.cache.refresh_now().await.expect("partial refresh");
    }

    // First tick: transition detected, forced refresh attempted (and the
    // flaky source still fails, so it stays Unhealthy).
    let event = rig.monitor.tick().await.expect("remediation taken");
    assert!(event.refresh_ok, "steady source keeps the refresh green");
    assert_eq!(rig.monitor.forced_refresh_count(), 1);

    // Still Unhealthy on the next tick, but no new transition: no second
    // forced refresh storm.
    assert!(rig.monitor.tick().await.is_none());
    assert_eq!(rig.monitor.forced_refresh_count(), 1);

    // Once it recovers and a later transition happens again, the monitor
    // reacts again.
    rig.flaky_fail.store(false, Ordering::SeqCst);
    rig.cache.refresh_now().await.expect("recovery refresh");
    assert!(rig.monitor.tick().await.is_none());

    rig.flaky_fail.store(true, Ordering::SeqCst);
    for _ in 0..3 {
        rig.cache.refresh_now().await.expect("partial refresh");
    }
    let event = rig.monitor.tick().await.expect("second remediation");
    assert_eq!(event.sources, vec!["flaky".to_string()]);
    assert_eq!(rig.monitor.forced_refresh_count(), 2);
}

#[tokio::test]
async fn remediations_are_recorded_for_observability() {
    let rig = rig();
    rig.cache.refresh_now().await.expect("prime");
    assert!(rig.monitor.recent_remediations(10).is_empty());

    rig.flaky_fail.store(true, Ordering::SeqCst);
    for _ in 0..3 {
        rig.cache.refresh_now().await.expect("partial refresh");
    }
    rig.monitor.tick().await.expect("remediation taken");

    let log = rig.monitor.recent_remediations(10);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sources, vec!["flaky".to_string()]);
}
