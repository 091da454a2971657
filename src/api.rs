use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::trending::cache::TrendCache;
use crate::trending::error::CacheError;
use crate::trending::monitor::{HealthMonitor, RemediationEvent};
use crate::trending::types::{SourceDescriptor, SourceHealth, TrendingItem};

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TrendCache>,
    pub monitor: Arc<HealthMonitor>,
    pub descriptors: Arc<Vec<SourceDescriptor>>,
    pub default_limit: usize,
    pub max_limit: usize,
    pub refresh_interval_secs: u64,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/trending", get(get_trending))
        .route("/trending/sources", get(list_sources))
        .route("/debug/remediations", get(debug_remediations))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct TrendingQuery {
    limit: Option<usize>,
}

#[derive(serde::Serialize)]
struct TrendingResponse {
    count: usize,
    limit: usize,
    items: Vec<TrendingItem>,
}

/// Read path: only ever touches the cache, never a provider.
async fn get_trending(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> Result<Json<TrendingResponse>, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(state.default_limit).clamp(1, state.max_limit);
    match state.cache.read(limit) {
        Ok(items) => Ok(Json(TrendingResponse {
            count: items.len(),
            limit,
            items,
        })),
        Err(CacheError::Empty) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "trending data not ready yet".to_string(),
        )),
    }
}

#[derive(serde::Serialize)]
struct SourceStatus {
    descriptor: SourceDescriptor,
    health: Option<SourceHealth>,
}

#[derive(serde::Serialize)]
struct ServiceStatus {
    last_refresh_at: Option<DateTime<Utc>>,
    refresh_interval_secs: u64,
    snapshot_generation: u64,
    forced_refreshes: u64,
}

#[derive(serde::Serialize)]
struct SourcesResponse {
    sources: Vec<SourceStatus>,
    service: ServiceStatus,
}

/// Configured descriptors joined with live health; disabled sources appear
/// with no health entry.
async fn list_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    let health = state.cache.read_source_health();
    let sources = state
        .descriptors
        .iter()
        .map(|d| SourceStatus {
            descriptor: d.clone(),
            health: health.get(&d.id).cloned(),
        })
        .collect();
    Json(SourcesResponse {
        sources,
        service: ServiceStatus {
            last_refresh_at: state.cache.last_refresh_at(),
            refresh_interval_secs: state.refresh_interval_secs,
            snapshot_generation: state.cache.generation(),
            forced_refreshes: state.monitor.forced_refresh_count(),
        },
    })
}

async fn debug_remediations(State(state): State<AppState>) -> Json<Vec<RemediationEvent>> {
    Json(state.monitor.recent_remediations(10))
}
