// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod metrics;
pub mod trending;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;
pub use crate::trending::cache::TrendCache;
pub use crate::trending::monitor::HealthMonitor;
pub use crate::trending::types::{
    AggregateSnapshot, HealthStatus, SourceDescriptor, SourceHealth, TrendingItem,
};

use std::sync::Arc;

use crate::trending::aggregator::Aggregator;
use crate::trending::providers;

/// Wire the full aggregation stack from configuration: source registry,
/// HTTP adapters, aggregator, cache, and monitor. The returned state is
/// everything the router and the background loops need.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let descriptors = config::load_registry_default(&cfg.enabled_sources)?;
    let sources = providers::build_enabled(&descriptors);
    if sources.is_empty() {
        tracing::warn!("no enabled sources; /trending will stay empty");
    }

    let aggregator = Aggregator::new(
        sources,
        &descriptors,
        cfg.build_ranker(),
        cfg.aggregator_config(),
    );
    let cache = Arc::new(TrendCache::new(aggregator));
    let monitor = Arc::new(HealthMonitor::new(Arc::clone(&cache)));

    Ok(AppState {
        cache,
        monitor,
        descriptors: Arc::new(descriptors),
        default_limit: cfg.default_limit,
        max_limit: cfg.overall_limit,
        refresh_interval_secs: cfg.refresh_interval.as_secs(),
    })
}
