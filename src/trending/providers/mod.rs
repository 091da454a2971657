// src/trending/providers/mod.rs
pub mod github;
pub mod hackernews;
pub mod reddit;

use std::sync::Arc;

use crate::trending::providers::{
    github::GitHubProvider, hackernews::HackerNewsProvider, reddit::RedditProvider,
};
use crate::trending::types::{SourceDescriptor, TrendSource};

/// Build HTTP-mode adapters for the enabled descriptors. Unknown ids are
/// skipped with a warning so a typo in configuration degrades instead of
/// failing boot.
pub fn build_enabled(descriptors: &[SourceDescriptor]) -> Vec<Arc<dyn TrendSource>> {
    let mut out: Vec<Arc<dyn TrendSource>> = Vec::new();
    for d in descriptors.iter().filter(|d| d.enabled) {
        match d.id.as_str() {
            "reddit" => out.push(Arc::new(RedditProvider::from_http())),
            "hackernews" => out.push(Arc::new(HackerNewsProvider::from_http())),
            "github" => out.push(Arc::new(GitHubProvider::from_http())),
            other => {
                tracing::warn!(source = other, "unknown trending source skipped");
            }
        }
    }
    out
}
