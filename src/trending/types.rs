// src/trending/types.rs
use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::trending::error::ProviderError;

/// One normalized trending entity from a single provider.
///
/// Identity for deduplication is `(source_id, external_id)`; everything else
/// is display payload. Items are immutable once constructed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct TrendingItem {
    pub source_id: String,   // e.g., "forum", "news"
    pub external_id: String, // provider-native id, unique within the source
    pub title: String,
    pub url: String,
    /// Provider-native score; not comparable across providers without
    /// normalization.
    pub score: f64,
    pub fetched_at: DateTime<Utc>,
}

impl TrendingItem {
    /// Dedup key: `(source_id, external_id)`.
    pub fn identity(&self) -> (&str, &str) {
        (&self.source_id, &self.external_id)
    }
}

/// Configuration-level description of one provider. The enabled set is
/// fixed at startup from the active-sources list.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub display_name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Trust/impact multiplier used by the weighted ranking strategy.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Thresholds feeding the status derivation rule.
#[derive(Debug, Clone, Copy)]
pub struct HealthThresholds {
    /// Consecutive failures at which a source becomes Unhealthy.
    /// Below this (but >= 1) it is Degraded.
    pub unhealthy_after: u32,
    /// A source whose last success is older than this is Unhealthy even if
    /// its failure streak is short.
    pub stale_after: Duration,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            unhealthy_after: 3,
            stale_after: Duration::from_secs(2700),
        }
    }
}

/// Heartbeat record for one source. Mutated only by the aggregator after
/// each fetch attempt; the monitor re-derives `status` between refreshes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceHealth {
    pub source_id: String,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub status: HealthStatus,
}

impl SourceHealth {
    /// Fresh record for a source that has not been attempted yet.
    pub fn unknown(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            last_success_at: None,
            last_failure_at: None,
            consecutive_failures: 0,
            status: HealthStatus::Healthy,
        }
    }

    /// Fold in a successful fetch at `now`.
    pub fn record_success(&mut self, now: DateTime<Utc>, thresholds: &HealthThresholds) {
        self.last_success_at = Some(now);
        self.consecutive_failures = 0;
        self.status = derive_status(self, now, thresholds);
    }

    /// Fold in a failed fetch at `now`.
    pub fn record_failure(&mut self, now: DateTime<Utc>, thresholds: &HealthThresholds) {
        self.last_failure_at = Some(now);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.status = derive_status(self, now, thresholds);
    }
}

/// Status rule, re-evaluated on every aggregator refresh and monitor tick.
///
/// Precedence: failure streak, then staleness. A source that has failed
/// without ever succeeding counts as stale immediately; a source never
/// attempted at all stays Healthy so startup does not trip the monitor.
pub fn derive_status(
    health: &SourceHealth,
    now: DateTime<Utc>,
    thresholds: &HealthThresholds,
) -> HealthStatus {
    if health.consecutive_failures >= thresholds.unhealthy_after {
        return HealthStatus::Unhealthy;
    }
    let stale = match health.last_success_at {
        Some(ts) => {
            let age = (now - ts).to_std().unwrap_or(Duration::ZERO);
            age > thresholds.stale_after
        }
        None => health.last_failure_at.is_some(),
    };
    if stale {
        return HealthStatus::Unhealthy;
    }
    if health.consecutive_failures > 0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Immutable aggregation result installed into the cache. Replaced
/// wholesale on every successful refresh, never mutated in place.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AggregateSnapshot {
    pub items: Vec<TrendingItem>,
    pub generated_at: DateTime<Utc>,
    pub per_source_health: HashMap<String, SourceHealth>,
}

/// Capability contract implemented by each provider adapter.
///
/// Adapters hold no mutable cross-call state beyond connection pooling and
/// have no side effects past the network call itself.
#[async_trait::async_trait]
pub trait TrendSource: Send + Sync {
    /// Fetch up to `limit` items in the provider's own rank order. The
    /// adapter must give up by `timeout`; the aggregator additionally
    /// bounds the call so a stuck adapter cannot stall a refresh.
    async fn fetch(&self, limit: usize, timeout: Duration)
        -> Result<Vec<TrendingItem>, ProviderError>;

    /// Stable unique id; the dedup and health key.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> HealthThresholds {
        HealthThresholds {
            unhealthy_after: 3,
            stale_after: Duration::from_secs(600),
        }
    }

    #[test]
    fn never_attempted_source_is_healthy() {
        let h = SourceHealth::unknown("forum");
        assert_eq!(derive_status(&h, Utc::now(), &thresholds()), HealthStatus::Healthy);
    }

    #[test]
    fn failure_streak_walks_healthy_degraded_unhealthy() {
        let now = Utc::now();
        let th = thresholds();
        let mut h = SourceHealth::unknown("forum");
        h.record_success(now, &th);
        assert_eq!(h.status, HealthStatus::Healthy);

        h.record_failure(now, &th);
        assert_eq!(h.status, HealthStatus::Degraded);
        h.record_failure(now, &th);
        assert_eq!(h.status, HealthStatus::Degraded);
        h.record_failure(now, &th);
        assert_eq!(h.status, HealthStatus::Unhealthy);
        assert_eq!(h.consecutive_failures, 3);

        // One success resets the streak completely.
        h.record_success(now, &th);
        assert_eq!(h.status, HealthStatus::Healthy);
        assert_eq!(h.consecutive_failures, 0);
    }

    #[test]
    fn failed_without_ever_succeeding_is_unhealthy() {
        let now = Utc::now();
        let th = thresholds();
        let mut h = SourceHealth::unknown("news");
        h.record_failure(now, &th);
        assert_eq!(h.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn stale_success_turns_unhealthy_even_without_failures() {
        let th = thresholds();
        let now = Utc::now();
        let mut h = SourceHealth::unknown("code_hosting");
        h.record_success(now - chrono::Duration::seconds(601), &th);
        assert_eq!(derive_status(&h, now, &th), HealthStatus::Unhealthy);
    }
}
