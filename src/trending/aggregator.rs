// src/trending/aggregator.rs
//! Fan-out refresh: one concurrent fetch per enabled source under a shared
//! deadline, merged into a fresh `AggregateSnapshot`.
//!
//! Pure computation: this module never touches the cache. Provider errors
//! are folded into per-source health and never escape the refresh boundary;
//! the only error surfaced is the all-sources-failed case.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, histogram};
use tokio::task::JoinSet;

use crate::trending::error::{AggregateError, ProviderError};
use crate::trending::types::{
    AggregateSnapshot, HealthThresholds, SourceDescriptor, SourceHealth, TrendSource, TrendingItem,
};
use crate::trending::{dedupe_by_identity, ensure_metrics_described, Ranker, SourceBucket};

#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    pub per_source_limit: usize,
    pub overall_limit: usize,
    /// Shared per-fetch deadline; fan-out wall time is bounded by one
    /// timeout, not N sequential ones.
    pub timeout: Duration,
    pub thresholds: HealthThresholds,
}

pub struct Aggregator {
    sources: Vec<Arc<dyn TrendSource>>,
    weights: HashMap<String, f64>,
    ranker: Box<dyn Ranker>,
    cfg: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        sources: Vec<Arc<dyn TrendSource>>,
        descriptors: &[SourceDescriptor],
        ranker: Box<dyn Ranker>,
        cfg: AggregatorConfig,
    ) -> Self {
        let weights = descriptors
            .iter()
            .map(|d| (d.id.clone(), d.weight))
            .collect();
        Self {
            sources,
            weights,
            ranker,
            cfg,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.cfg
    }

    /// Ids of the sources this aggregator fans out to.
    pub fn source_ids(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Run one refresh cycle against `prev_health` (carried over so failure
    /// streaks survive across cycles). The merge step starts only after
    /// every fetch has resolved (success, error, or timeout).
    pub async fn refresh(
        &self,
        prev_health: HashMap<String, SourceHealth>,
    ) -> Result<AggregateSnapshot, AggregateError> {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let mut set: JoinSet<(&'static str, Result<Vec<TrendingItem>, ProviderError>)> =
            JoinSet::new();
        for source in &self.sources {
            let source = Arc::clone(source);
            let limit = self.cfg.per_source_limit;
            let timeout = self.cfg.timeout;
            set.spawn(async move {
                let fetched = match tokio::time::timeout(timeout, source.fetch(limit, timeout)).await
                {
                    Ok(inner) => inner,
                    // Deadline exceeded: the in-flight call is dropped and
                    // only this source fails.
                    Err(_) => Err(ProviderError::Unavailable(format!(
                        "fetch exceeded {}ms deadline",
                        timeout.as_millis()
                    ))),
                };
                (source.id(), fetched)
            });
        }

        let mut results: HashMap<&'static str, Result<Vec<TrendingItem>, ProviderError>> =
            HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, fetched)) => {
                    results.insert(id, fetched);
                }
                Err(e) => {
                    // A panicked fetch task; the owning source shows up as
                    // missing below and is recorded as a failure.
                    tracing::warn!(error = ?e, "fetch task aborted");
                }
            }
        }

        let now = Utc::now();
        let mut health = prev_health;
        let mut buckets: Vec<SourceBucket> = Vec::with_capacity(self.sources.len());
        let mut any_success = false;

        for source in &self.sources {
            let id = source.id();
            let entry = health
                .entry(id.to_string())
                .or_insert_with(|| SourceHealth::unknown(id));
            match results.remove(id) {
                Some(Ok(items)) => {
                    any_success = true;
                    entry.record_success(now, &self.cfg.thresholds);
                    buckets.push(SourceBucket {
                        source_id: id.to_string(),
                        weight: self.weights.get(id).copied().unwrap_or(1.0),
                        items,
                    });
                }
                Some(Err(e)) => {
                    tracing::warn!(source = id, error = %e, "provider error");
                    counter!("trending_provider_errors_total", "source" => id, "kind" => e.kind())
                        .increment(1);
                    entry.record_failure(now, &self.cfg.thresholds);
                }
                None => {
                    counter!("trending_provider_errors_total", "source" => id, "kind" => "panic")
                        .increment(1);
                    entry.record_failure(now, &self.cfg.thresholds);
                }
            }
        }

        histogram!("trending_refresh_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !any_success {
            counter!("trending_refresh_errors_total").increment(1);
            return Err(AggregateError::AllSourcesFailed { health });
        }

        let deduped = dedupe_by_identity(&mut buckets);
        if deduped > 0 {
            tracing::debug!(removed = deduped, "duplicate identities dropped in merge");
        }
        let items = self.ranker.rank(&buckets, self.cfg.overall_limit);

        counter!("trending_refresh_total").increment(1);
        counter!("trending_items_merged_total").increment(items.len() as u64);

        Ok(AggregateSnapshot {
            items,
            generated_at: now,
            per_source_health: health,
        })
    }
}
