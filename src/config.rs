// src/config.rs
//! Environment-driven configuration and the source-registry file.
//!
//! All knobs have working defaults so the service boots with no env at all;
//! `.env` is honored in local runs via `dotenvy` in the entrypoint.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::trending::aggregator::AggregatorConfig;
use crate::trending::scheduler::SchedulerCfg;
use crate::trending::types::{HealthThresholds, SourceDescriptor};
use crate::trending::{Ranker, RoundRobinRanker, WeightedScoreRanker};

const ENV_SOURCES_PATH: &str = "TRENDING_SOURCES_PATH";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Items returned by `/trending` when no limit is given.
    pub default_limit: usize,
    /// Items requested from each provider per refresh.
    pub per_source_limit: usize,
    /// Merged items retained in a snapshot; the ceiling for any read.
    pub overall_limit: usize,
    pub refresh_interval: Duration,
    pub monitor_interval: Duration,
    pub http_timeout: Duration,
    pub unhealthy_after: u32,
    pub stale_after: Duration,
    /// Active source ids, in ranking order.
    pub enabled_sources: Vec<String>,
    /// Ranking strategy name: "round_robin" or "weighted_score".
    pub ranker: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            per_source_limit: 25,
            overall_limit: 100,
            refresh_interval: Duration::from_secs(900),
            monitor_interval: Duration::from_secs(60),
            http_timeout: Duration::from_secs(10),
            unhealthy_after: 3,
            stale_after: Duration::from_secs(2700),
            enabled_sources: vec!["reddit".into(), "hackernews".into(), "github".into()],
            ranker: "round_robin".into(),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let sources = std::env::var("TRENDING_SOURCES")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or(d.enabled_sources);

        Self {
            default_limit: env_u64("TRENDING_DEFAULT_LIMIT", d.default_limit as u64) as usize,
            per_source_limit: env_u64("TRENDING_PER_SOURCE_LIMIT", d.per_source_limit as u64)
                as usize,
            overall_limit: env_u64("TRENDING_OVERALL_LIMIT", d.overall_limit as u64) as usize,
            refresh_interval: Duration::from_secs(env_u64(
                "TRENDING_REFRESH_SECS",
                d.refresh_interval.as_secs(),
            )),
            monitor_interval: Duration::from_secs(env_u64(
                "MONITOR_INTERVAL_SECS",
                d.monitor_interval.as_secs(),
            )),
            http_timeout: Duration::from_secs(env_u64(
                "HTTP_TIMEOUT_SECS",
                d.http_timeout.as_secs(),
            )),
            unhealthy_after: env_u64("UNHEALTHY_AFTER", d.unhealthy_after as u64) as u32,
            stale_after: Duration::from_secs(env_u64(
                "STALE_AFTER_SECS",
                d.stale_after.as_secs(),
            )),
            enabled_sources: sources,
            ranker: std::env::var("TRENDING_RANKER").unwrap_or(d.ranker),
        }
    }

    pub fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            unhealthy_after: self.unhealthy_after,
            stale_after: self.stale_after,
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            per_source_limit: self.per_source_limit,
            overall_limit: self.overall_limit,
            timeout: self.http_timeout,
            thresholds: self.thresholds(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerCfg {
        SchedulerCfg {
            refresh_interval: self.refresh_interval,
            monitor_interval: self.monitor_interval,
        }
    }

    pub fn build_ranker(&self) -> Box<dyn Ranker> {
        match self.ranker.as_str() {
            "weighted_score" => Box::new(WeightedScoreRanker),
            "round_robin" => Box::new(RoundRobinRanker),
            other => {
                tracing::warn!(ranker = other, "unknown ranker; using round_robin");
                Box::new(RoundRobinRanker)
            }
        }
    }
}

/// Load the source registry from an explicit path. TOML or JSON.
pub fn load_registry_from(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source registry from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_registry(&content, ext.as_str())
}

/// Load the source registry using env var + fallbacks:
/// 1) $TRENDING_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in seed
/// then mark `enabled` from the active-sources list.
pub fn load_registry_default(enabled: &[String]) -> Result<Vec<SourceDescriptor>> {
    let mut registry = if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("TRENDING_SOURCES_PATH points to non-existent path"));
        }
        load_registry_from(&pb)?
    } else {
        let toml_p = PathBuf::from("config/sources.toml");
        let json_p = PathBuf::from("config/sources.json");
        if toml_p.exists() {
            load_registry_from(&toml_p)?
        } else if json_p.exists() {
            load_registry_from(&json_p)?
        } else {
            default_seed()
        }
    };

    for d in registry.iter_mut() {
        d.enabled = enabled.iter().any(|s| s.eq_ignore_ascii_case(&d.id));
    }
    Ok(registry)
}

fn parse_registry(s: &str, hint_ext: &str) -> Result<Vec<SourceDescriptor>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported source registry format"))
}

fn parse_toml(s: &str) -> Result<Vec<SourceDescriptor>> {
    #[derive(serde::Deserialize)]
    struct RegistryFile {
        sources: Vec<SourceDescriptor>,
    }
    let v: RegistryFile = toml::from_str(s)?;
    Ok(v.sources)
}

fn parse_json(s: &str) -> Result<Vec<SourceDescriptor>> {
    let v: Vec<SourceDescriptor> = serde_json::from_str(s)?;
    Ok(v)
}

/// Built-in registry matching the three bundled providers. Weights mirror
/// operational trust: code-hosting stars move slowest, forum scores are
/// noisiest.
pub fn default_seed() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor {
            id: "reddit".into(),
            display_name: "Reddit r/popular".into(),
            enabled: true,
            weight: 1.1,
        },
        SourceDescriptor {
            id: "hackernews".into(),
            display_name: "Hacker News".into(),
            enabled: true,
            weight: 1.0,
        },
        SourceDescriptor {
            id: "github".into(),
            display_name: "GitHub Trending".into(),
            enabled: true,
            weight: 1.2,
        },
    ]
}
