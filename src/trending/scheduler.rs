// src/trending/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::trending::cache::TrendCache;
use crate::trending::monitor::HealthMonitor;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub refresh_interval: Duration,
    /// Monitor cadence; typically shorter than the refresh interval so
    /// degradation is caught between scheduled refreshes.
    pub monitor_interval: Duration,
}

/// Handles to the two background loops. Both are independently abortable
/// and share no state except the cache's synchronized write path.
pub struct BackgroundTasks {
    refresh: JoinHandle<()>,
    monitor: JoinHandle<()>,
}

/// Start the scheduled refresh timer and the health monitor loop.
pub fn spawn(
    cache: Arc<TrendCache>,
    monitor: Arc<HealthMonitor>,
    cfg: SchedulerCfg,
) -> BackgroundTasks {
    let refresh = tokio::spawn({
        let cache = Arc::clone(&cache);
        async move {
            let mut ticker = tokio::time::interval(cfg.refresh_interval);
            loop {
                ticker.tick().await;
                match cache.refresh_now().await {
                    Ok(snapshot) => {
                        tracing::info!(
                            target: "trending",
                            items = snapshot.items.len(),
                            generation = cache.generation(),
                            "scheduled refresh tick"
                        );
                    }
                    Err(e) => {
                        // Stale data keeps serving; the next tick retries.
                        tracing::warn!(target: "trending", error = %e, "scheduled refresh failed");
                    }
                }
            }
        }
    });

    let monitor = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.monitor_interval);
        loop {
            ticker.tick().await;
            if let Some(event) = monitor.tick().await {
                tracing::info!(
                    target: "monitor",
                    sources = ?event.sources,
                    refresh_ok = event.refresh_ok,
                    "remediation attempted"
                );
            }
        }
    });

    BackgroundTasks { refresh, monitor }
}

impl BackgroundTasks {
    /// Deterministically stop both loops at shutdown.
    pub fn shutdown(self) {
        self.refresh.abort();
        self.monitor.abort();
        tracing::info!("background tasks stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.refresh.is_finished() && !self.monitor.is_finished()
    }
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(900),
            monitor_interval: Duration::from_secs(60),
        }
    }
}
