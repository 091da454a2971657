// src/trending/error.rs
//! Error taxonomy for the aggregation core.
//!
//! Provider errors never cross the aggregator boundary as errors; they are
//! folded into `SourceHealth`. Nothing here is process-fatal: the system
//! degrades to stale or partial data instead of crashing.

use std::collections::HashMap;

use crate::trending::types::SourceHealth;

/// Adapter-level failures. Always recoverable on the next cycle.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network failure or deadline exceeded.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Response arrived but could not be understood.
    #[error("provider protocol error: {0}")]
    Protocol(String),

    #[error("provider rate limited")]
    RateLimited,
}

impl ProviderError {
    /// Short label used for per-source error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Unavailable(_) => "unavailable",
            ProviderError::Protocol(_) => "protocol",
            ProviderError::RateLimited => "rate_limited",
        }
    }
}

/// Aggregator-level failure: every enabled source failed this cycle.
///
/// Carries the updated health map so the refresh driver keeps tracking
/// failure streaks while it falls back to the previous snapshot.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("all {} enabled sources failed", .health.len())]
    AllSourcesFailed {
        health: HashMap<String, SourceHealth>,
    },
}

/// Outcome of `TrendCache::refresh_now` when no new snapshot was installed.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// All sources failed and no prior snapshot exists to fall back on.
    #[error("aggregation unavailable: no source succeeded and no snapshot exists")]
    AggregationUnavailable,

    /// All sources failed; the previous snapshot is still being served.
    #[error("all sources failed; serving previous snapshot")]
    AllSourcesFailed,
}

/// Read-path failure surfaced to the HTTP layer as a transient condition.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    /// No snapshot yet; the first refresh has not completed.
    #[error("cache empty: first refresh still pending")]
    Empty,
}
