// tests/api_http.rs
//! In-process router tests: read path, not-ready signaling, and the
//! sources/status view. The router is exercised directly via
//! tower::ServiceExt::oneshot, no sockets.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt; // for oneshot

use trending_aggregator::trending::aggregator::{Aggregator, AggregatorConfig};
use trending_aggregator::trending::error::ProviderError;
use trending_aggregator::trending::types::{
    HealthThresholds, SourceDescriptor, TrendSource, TrendingItem,
};
use trending_aggregator::trending::RoundRobinRanker;
use trending_aggregator::{create_router, AppState, HealthMonitor, TrendCache};

struct StaticSource {
    id: &'static str,
    count: usize,
}

#[async_trait]
impl TrendSource for StaticSource {
    async fn fetch(
        &self,
        _limit: usize,
        _timeout: Duration,
    ) -> Result<Vec<TrendingItem>, ProviderError> {
        Ok((1..=self.count)
            .map(|n| TrendingItem {
                source_id: self.id.to_string(),
                external_id: format!("{}-{n}", self.id),
                title: format!("{} item {n}", self.id),
                url: format!("https://example.com/{}/{n}", self.id),
                score: 100.0 - n as f64,
                fetched_at: Utc::now(),
            })
            .collect())
    }

    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        self.id
    }
}

fn build_app() -> (Router, Arc<TrendCache>) {
    let descriptors = vec![
        SourceDescriptor {
            id: "alpha".to_string(),
            display_name: "Alpha".to_string(),
            enabled: true,
            weight: 1.0,
        },
        SourceDescriptor {
            id: "beta".to_string(),
            display_name: "Beta".to_string(),
            enabled: true,
            weight: 1.0,
        },
    ];
    let sources: Vec<Arc<dyn TrendSource>> = vec![
        Arc::new(StaticSource { id: "alpha", count: 8 }),
        Arc::new(StaticSource { id: "beta", count: 8 }),
    ];
    let aggregator = Aggregator::new(
        sources,
        &descriptors,
        Box::new(RoundRobinRanker),
        AggregatorConfig {
            per_source_limit: 10,
            overall_limit: 100,
            timeout: Duration::from_secs(5),
            thresholds: HealthThresholds::default(),
        },
    );
    let cache = Arc::new(TrendCache::new(aggregator));
    let monitor = Arc::new(HealthMonitor::new(Arc::clone(&cache)));
    let state = AppState {
        cache: Arc::clone(&cache),
        monitor,
        descriptors: Arc::new(descriptors),
        default_limit: 10,
        max_limit: 100,
        refresh_interval_secs: 900,
    };
    (create_router(state), cache)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request build");
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or(Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, value)
}

#[tokio::test]
async fn health_probe_answers_ok() {
    let (app, _cache) = build_app();
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request build");
    let resp = app.oneshot(req).await.expect("router response");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn trending_is_unavailable_before_first_refresh() {
    let (app, _cache) = build_app();
    let (status, _body) = get_json(&app, "/trending").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn trending_serves_snapshot_after_refresh() {
    let (app, cache) = build_app();
    cache.refresh_now().await.expect("prime");

    let (status, body) = get_json(&app, "/trending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["count"], 10);
    let items = body["items"].as_array().expect("items array");
    assert_eq!(items.len(), 10);
    // Round-robin head: one item from each source.
    assert_eq!(items[0]["source_id"], "alpha");
    assert_eq!(items[1]["source_id"], "beta");
}

#[tokio::test]
async fn trending_limit_is_clamped_and_honored() {
    let (app, cache) = build_app();
    cache.refresh_now().await.expect("prime");

    let (status, body) = get_json(&app, "/trending?limit=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);

    // limit=0 clamps up to 1 instead of erroring.
    let (status, body) = get_json(&app, "/trending?limit=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn sources_view_joins_descriptors_and_health() {
    let (app, cache) = build_app();

    // Before any refresh: every configured source appears, health seeded.
    let (status, body) = get_json(&app, "/trending/sources").await;
    assert_eq!(status, StatusCode::OK);
    let sources = body["sources"].as_array().expect("sources array");
    assert_eq!(sources.len(), 2);
    assert!(sources.iter().all(|s| !s["health"].is_null()));
    assert_eq!(body["service"]["snapshot_generation"], 0);

    cache.refresh_now().await.expect("prime");
    let (_status, body) = get_json(&app, "/trending/sources").await;
    assert_eq!(body["service"]["snapshot_generation"], 1);
    let sources = body["sources"].as_array().expect("sources array");
    for s in sources {
        assert_eq!(s["health"]["consecutive_failures"], 0);
        assert_eq!(s["health"]["status"], "Healthy");
    }
}

#[tokio::test]
async fn remediation_log_starts_empty() {
    let (app, _cache) = build_app();
    let (status, body) = get_json(&app, "/debug/remediations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}
