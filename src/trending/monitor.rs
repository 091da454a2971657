// src/trending/monitor.rs
//! Health monitor: watches the per-source health the aggregator records,
//! and when a source slips into Unhealthy, forces an out-of-band cache
//! refresh instead of waiting for the next scheduled tick.
//!
//! Sources are never disabled permanently; recovery is always re-attempted
//! and the aggregator's partial-failure tolerance keeps the rest serving.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::trending::cache::TrendCache;
use crate::trending::types::HealthStatus;

/// One remediation attempt, kept for the `/debug/remediations` view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RemediationEvent {
    pub ts: DateTime<Utc>,
    /// Sources that transitioned into Unhealthy this tick.
    pub sources: Vec<String>,
    /// Whether the forced refresh installed a new snapshot.
    pub refresh_ok: bool,
}

/// Capped in-memory log of remediation actions.
#[derive(Debug)]
pub struct RemediationLog {
    inner: Mutex<Vec<RemediationEvent>>,
    cap: usize,
}

impl RemediationLog {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            cap: cap.min(10_000),
        }
    }

    pub fn push(&self, event: RemediationEvent) {
        let mut v = self.inner.lock().expect("remediation log mutex poisoned");
        v.push(event);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<RemediationEvent> {
        let v = self.inner.lock().expect("remediation log mutex poisoned");
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }
}

pub struct HealthMonitor {
    cache: Arc<TrendCache>,
    /// Statuses as of the previous tick, for transition detection.
    last_seen: Mutex<HashMap<String, HealthStatus>>,
    remediations: RemediationLog,
    forced_refreshes: AtomicU64,
}

impl HealthMonitor {
    pub fn new(cache: Arc<TrendCache>) -> Self {
        Self {
            cache,
            last_seen: Mutex::new(HashMap::new()),
            remediations: RemediationLog::with_capacity(500),
            forced_refreshes: AtomicU64::new(0),
        }
    }

    /// One monitor cycle: re-derive statuses, diff against the previous
    /// tick, and self-heal on any transition into Unhealthy. Returns the
    /// remediation taken, if any.
    pub async fn tick(&self) -> Option<RemediationEvent> {
        let now = Utc::now();
        let health = self.cache.revalidate_statuses(now);

        let mut newly_unhealthy: Vec<String> = Vec::new();
        {
            let mut last = self.last_seen.lock().expect("monitor state mutex poisoned");
            for (id, entry) in &health {
                let prev = last.insert(id.clone(), entry.status);
                if entry.status == HealthStatus::Unhealthy && prev != Some(HealthStatus::Unhealthy)
                {
                    newly_unhealthy.push(id.clone());
                }
            }
        }

        if newly_unhealthy.is_empty() {
            return None;
        }
        newly_unhealthy.sort();

        tracing::info!(
            target: "monitor",
            sources = ?newly_unhealthy,
            "sources turned unhealthy; forcing cache refresh"
        );
        counter!("trending_forced_refresh_total").increment(1);
        self.forced_refreshes.fetch_add(1, Ordering::SeqCst);

        let refresh_ok = match self.cache.refresh_now().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(target: "monitor", error = %e, "forced refresh failed");
                false
            }
        };

        let event = RemediationEvent {
            ts: now,
            sources: newly_unhealthy,
            refresh_ok,
        };
        self.remediations.push(event.clone());
        Some(event)
    }

    /// Side channel for tests and the status view: forced refreshes so far.
    pub fn forced_refresh_count(&self) -> u64 {
        self.forced_refreshes.load(Ordering::SeqCst)
    }

    pub fn recent_remediations(&self, n: usize) -> Vec<RemediationEvent> {
        self.remediations.snapshot_last_n(n)
    }
}
