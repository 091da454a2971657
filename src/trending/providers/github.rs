// src/trending/providers/github.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use metrics::histogram;
use serde::Deserialize;

use crate::trending::clean_title;
use crate::trending::error::ProviderError;
use crate::trending::types::{TrendingItem, TrendSource};

const SOURCE_ID: &str = "github";
const SEARCH_URL: &str = "https://api.github.com/search/repositories";
const USER_AGENT: &str = "trending-aggregator/0.1";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    id: Option<u64>,
    full_name: Option<String>,
    html_url: Option<String>,
    stargazers_count: Option<f64>,
}

/// Repository-trending adapter over the GitHub search API, ordered by
/// stargazer count.
pub struct GitHubProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl GitHubProvider {
    pub fn from_http() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn parse_repos(body: &str, limit: usize) -> Result<Vec<TrendingItem>, ProviderError> {
        let t0 = std::time::Instant::now();
        let resp: SearchResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::Protocol(format!("github search json: {e}")))?;

        let fetched_at = Utc::now();
        let mut out = Vec::with_capacity(resp.items.len().min(limit));
        for repo in resp.items.into_iter() {
            if out.len() == limit {
                break;
            }
            let (Some(full_name), Some(html_url)) = (repo.full_name, repo.html_url) else {
                continue;
            };
            let external_id = match repo.id {
                Some(id) => id.to_string(),
                None => full_name.clone(),
            };
            out.push(TrendingItem {
                source_id: SOURCE_ID.to_string(),
                external_id,
                title: clean_title(&full_name),
                url: html_url,
                score: repo.stargazers_count.unwrap_or(0.0),
                fetched_at,
            });
        }

        histogram!("trending_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl TrendSource for GitHubProvider {
    async fn fetch(
        &self,
        limit: usize,
        timeout: Duration,
    ) -> Result<Vec<TrendingItem>, ProviderError> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_repos(body, limit),
            Mode::Http { client } => {
                let resp = client
                    .get(SEARCH_URL)
                    .header("Accept", "application/vnd.github+json")
                    .query(&[
                        ("q", "stars:>1".to_string()),
                        ("sort", "stars".to_string()),
                        ("order", "desc".to_string()),
                        ("per_page", limit.to_string()),
                    ])
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| ProviderError::Unavailable(format!("github get: {e}")))?;
                // GitHub signals search-rate exhaustion with 403 as well as 429.
                if matches!(
                    resp.status(),
                    reqwest::StatusCode::TOO_MANY_REQUESTS | reqwest::StatusCode::FORBIDDEN
                ) {
                    return Err(ProviderError::RateLimited);
                }
                let resp = resp
                    .error_for_status()
                    .map_err(|e| ProviderError::Unavailable(format!("github status: {e}")))?;
                let body = resp
                    .text()
                    .await
                    .map_err(|e| ProviderError::Unavailable(format!("github body: {e}")))?;
                Self::parse_repos(&body, limit)
            }
        }
    }

    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn display_name(&self) -> &'static str {
        "GitHub Trending"
    }
}
