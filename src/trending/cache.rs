// src/trending/cache.rs
//! # Rolling Cache
//! Holds the last successfully aggregated snapshot plus the live per-source
//! health registry. Reads never block on network I/O; writers are
//! serialized through an async gate with generation-based coalescing.
//!
//! Stale-but-available beats empty: a failed refresh keeps the previous
//! snapshot in place while the health registry still absorbs the failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use metrics::gauge;

use crate::trending::aggregator::Aggregator;
use crate::trending::error::{AggregateError, CacheError, RefreshError};
use crate::trending::types::{derive_status, AggregateSnapshot, HealthStatus, SourceHealth, TrendingItem};

pub struct TrendCache {
    aggregator: Aggregator,
    /// Current snapshot slot. `None` only before the first successful
    /// refresh.
    snapshot: RwLock<Option<Arc<AggregateSnapshot>>>,
    /// Live health registry, seeded with an entry per enabled source.
    health: RwLock<HashMap<String, SourceHealth>>,
    /// Writer gate: timer and monitor refreshes are serialized here.
    refresh_gate: tokio::sync::Mutex<()>,
    /// Bumped once per installed snapshot; lets a waiting writer detect
    /// that the in-flight refresh already produced a fresh result.
    generation: AtomicU64,
}

impl TrendCache {
    pub fn new(aggregator: Aggregator) -> Self {
        let health = aggregator
            .source_ids()
            .into_iter()
            .map(|id| (id.to_string(), SourceHealth::unknown(id)))
            .collect();
        Self {
            aggregator,
            snapshot: RwLock::new(None),
            health: RwLock::new(health),
            refresh_gate: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Up to `limit` items from the current snapshot. Non-blocking.
    pub fn read(&self, limit: usize) -> Result<Vec<TrendingItem>, CacheError> {
        let slot = self.snapshot.read().expect("snapshot lock poisoned");
        match slot.as_ref() {
            Some(snap) => Ok(snap.items.iter().take(limit).cloned().collect()),
            None => Err(CacheError::Empty),
        }
    }

    /// The whole current snapshot, if one has been installed.
    pub fn current_snapshot(&self) -> Option<Arc<AggregateSnapshot>> {
        self.snapshot.read().expect("snapshot lock poisoned").clone()
    }

    /// Copy of the live health registry. Non-blocking.
    pub fn read_source_health(&self) -> HashMap<String, SourceHealth> {
        self.health.read().expect("health lock poisoned").clone()
    }

    /// Re-derive every status against the current clock and write the
    /// results back. Called by the monitor each tick so time-based
    /// staleness shows up between refreshes.
    pub fn revalidate_statuses(&self, now: DateTime<Utc>) -> HashMap<String, SourceHealth> {
        let thresholds = self.aggregator.config().thresholds;
        let mut registry = self.health.write().expect("health lock poisoned");
        let mut unhealthy = 0usize;
        for entry in registry.values_mut() {
            entry.status = derive_status(entry, now, &thresholds);
            if entry.status == HealthStatus::Unhealthy {
                unhealthy += 1;
            }
        }
        gauge!("trending_sources_unhealthy").set(unhealthy as f64);
        registry.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Timestamp of the current snapshot, for the status view.
    pub fn last_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.current_snapshot().map(|s| s.generated_at)
    }

    /// Synchronously run the aggregator and install the result.
    ///
    /// Concurrent callers are serialized; a caller that waited out another
    /// writer's successful refresh adopts that snapshot instead of issuing
    /// a duplicate fan-out. On failure the previous snapshot is retained
    /// untouched and only the health registry is updated.
    pub async fn refresh_now(&self) -> Result<Arc<AggregateSnapshot>, RefreshError> {
        let entered_at = self.generation.load(Ordering::SeqCst);
        let _guard = self.refresh_gate.lock().await;
        if self.generation.load(Ordering::SeqCst) != entered_at {
            if let Some(snap) = self.current_snapshot() {
                tracing::debug!("refresh coalesced into in-flight result");
                return Ok(snap);
            }
        }

        let prev_health = self.read_source_health();
        match self.aggregator.refresh(prev_health).await {
            Ok(mut snapshot) => {
                {
                    let mut slot = self.snapshot.write().expect("snapshot lock poisoned");
                    if let Some(prev) = slot.as_ref() {
                        // generated_at is monotonically non-decreasing
                        // across installed snapshots.
                        if snapshot.generated_at < prev.generated_at {
                            snapshot.generated_at = prev.generated_at;
                        }
                    }
                    let installed = Arc::new(snapshot);
                    *slot = Some(Arc::clone(&installed));
                    *self.health.write().expect("health lock poisoned") =
                        installed.per_source_health.clone();
                    gauge!("trending_last_refresh_ts")
                        .set(installed.generated_at.timestamp() as f64);
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    Ok(installed)
                }
            }
            Err(AggregateError::AllSourcesFailed { health }) => {
                *self.health.write().expect("health lock poisoned") = health;
                let has_prior = self
                    .snapshot
                    .read()
                    .expect("snapshot lock poisoned")
                    .is_some();
                if has_prior {
                    Err(RefreshError::AllSourcesFailed)
                } else {
                    Err(RefreshError::AggregationUnavailable)
                }
            }
        }
    }
}
