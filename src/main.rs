//! Trending Aggregation Service — Binary Entrypoint
//! Boots the Axum HTTP server plus the background refresh timer and the
//! self-healing source monitor.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trending_aggregator::config::AppConfig;
use trending_aggregator::metrics::Metrics;
use trending_aggregator::trending::scheduler;
use trending_aggregator::{build_state, create_router};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - TRENDING_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("TRENDING_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trending=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = AppConfig::from_env();
    let metrics = Metrics::init(cfg.refresh_interval.as_secs());

    let state = build_state(&cfg).expect("failed to build trending service");

    // Prime the cache before serving. A failed first refresh is not fatal:
    // reads answer 503 until a later cycle or the monitor succeeds.
    if let Err(e) = state.cache.refresh_now().await {
        tracing::warn!(error = %e, "initial refresh failed; cache starts empty");
    }

    // Detached for the process lifetime; Shuttle tears the runtime down at
    // shutdown. `BackgroundTasks::shutdown` covers embedded use.
    let _tasks = scheduler::spawn(
        Arc::clone(&state.cache),
        Arc::clone(&state.monitor),
        cfg.scheduler_config(),
    );

    let router = create_router(state).merge(metrics.router());
    Ok(router.into())
}
