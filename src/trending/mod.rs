// src/trending/mod.rs
pub mod aggregator;
pub mod cache;
pub mod error;
pub mod monitor;
pub mod providers;
pub mod scheduler;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

use crate::trending::types::TrendingItem;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("trending_refresh_total", "Completed refresh cycles.");
        describe_counter!(
            "trending_refresh_errors_total",
            "Refresh cycles where no source succeeded."
        );
        describe_counter!(
            "trending_provider_errors_total",
            "Provider fetch/parse/timeout errors."
        );
        describe_counter!(
            "trending_forced_refresh_total",
            "Out-of-band refreshes triggered by the health monitor."
        );
        describe_counter!(
            "trending_items_merged_total",
            "Items surviving merge and dedup per refresh."
        );
        describe_histogram!("trending_refresh_ms", "Refresh fan-out wall time in milliseconds.");
        describe_histogram!("trending_parse_ms", "Provider payload parse time in milliseconds.");
        describe_gauge!(
            "trending_last_refresh_ts",
            "Unix ts of the last successfully installed snapshot."
        );
        describe_gauge!(
            "trending_sources_unhealthy",
            "Enabled sources currently derived Unhealthy."
        );
    });
}

/// Normalize a provider-supplied title: decode HTML entities, collapse
/// whitespace, trim. Provider payloads routinely carry `&amp;` and stray
/// newlines.
pub fn clean_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Per-source result feeding the ranking step, in the provider's own rank
/// order (best first).
#[derive(Debug, Clone)]
pub struct SourceBucket {
    pub source_id: String,
    pub weight: f64,
    pub items: Vec<TrendingItem>,
}

/// Remove duplicate identities across all buckets, first occurrence wins.
/// Buckets keep their per-source rank order. Returns the number removed.
pub fn dedupe_by_identity(buckets: &mut [SourceBucket]) -> usize {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut removed = 0usize;
    for bucket in buckets.iter_mut() {
        bucket.items.retain(|it| {
            let fresh = seen.insert((it.source_id.clone(), it.external_id.clone()));
            if !fresh {
                removed += 1;
            }
            fresh
        });
    }
    removed
}

/// Pluggable ranking strategy applied after dedup.
pub trait Ranker: Send + Sync {
    /// Produce the final ordering, truncated to `limit`. Buckets arrive in
    /// configured source order, each in descending per-source rank.
    fn rank(&self, buckets: &[SourceBucket], limit: usize) -> Vec<TrendingItem>;

    fn name(&self) -> &'static str;
}

/// Default strategy: stable round-robin interleave across sources so no
/// single provider dominates the head of the list.
#[derive(Debug, Default)]
pub struct RoundRobinRanker;

impl Ranker for RoundRobinRanker {
    fn rank(&self, buckets: &[SourceBucket], limit: usize) -> Vec<TrendingItem> {
        let total: usize = buckets.iter().map(|b| b.items.len()).sum();
        let mut out = Vec::with_capacity(total.min(limit));
        let mut depth = 0usize;
        while out.len() < limit {
            let mut any = false;
            for bucket in buckets {
                if let Some(item) = bucket.items.get(depth) {
                    any = true;
                    out.push(item.clone());
                    if out.len() == limit {
                        return out;
                    }
                }
            }
            if !any {
                break;
            }
            depth += 1;
        }
        out
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

/// Alternate strategy: global descending `score * source weight` order.
/// Native scores are not comparable across providers, so this favors
/// high-volume score scales; kept for operators who want score dominance.
#[derive(Debug, Default)]
pub struct WeightedScoreRanker;

impl Ranker for WeightedScoreRanker {
    fn rank(&self, buckets: &[SourceBucket], limit: usize) -> Vec<TrendingItem> {
        let mut weighted: Vec<(f64, TrendingItem)> = Vec::new();
        for bucket in buckets {
            for item in &bucket.items {
                weighted.push((item.score * bucket.weight, item.clone()));
            }
        }
        // Stable sort keeps bucket order for exact ties.
        weighted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        weighted.into_iter().take(limit).map(|(_, it)| it).collect()
    }

    fn name(&self) -> &'static str {
        "weighted_score"
    }
}
