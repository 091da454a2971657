// src/trending/providers/hackernews.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use metrics::histogram;
use serde::Deserialize;

use crate::trending::clean_title;
use crate::trending::error::ProviderError;
use crate::trending::types::{TrendingItem, TrendSource};

const SOURCE_ID: &str = "hackernews";
const SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    story_title: Option<String>,
    url: Option<String>,
    story_url: Option<String>,
    points: Option<f64>,
}

/// News-aggregator adapter over the Hacker News Algolia front-page search.
pub struct HackerNewsProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl HackerNewsProvider {
    pub fn from_http() -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
            },
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    /// Parse a search response, front-page rank order preserved. Comment
    /// hits carry `story_title`/`story_url` instead of the plain fields.
    pub fn parse_hits(body: &str, limit: usize) -> Result<Vec<TrendingItem>, ProviderError> {
        let t0 = std::time::Instant::now();
        let resp: SearchResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::Protocol(format!("hackernews search json: {e}")))?;

        let fetched_at = Utc::now();
        let mut out = Vec::with_capacity(resp.hits.len().min(limit));
        for hit in resp.hits.into_iter() {
            if out.len() == limit {
                break;
            }
            let title = hit.title.or(hit.story_title);
            let url = hit.url.or(hit.story_url);
            let (Some(title), Some(url)) = (title, url) else {
                continue;
            };
            out.push(TrendingItem {
                source_id: SOURCE_ID.to_string(),
                external_id: hit.object_id,
                title: clean_title(&title),
                url,
                score: hit.points.unwrap_or(0.0),
                fetched_at,
            });
        }

        histogram!("trending_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl TrendSource for HackerNewsProvider {
    async fn fetch(
        &self,
        limit: usize,
        timeout: Duration,
    ) -> Result<Vec<TrendingItem>, ProviderError> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_hits(body, limit),
            Mode::Http { client } => {
                let resp = client
                    .get(SEARCH_URL)
                    .query(&[
                        ("tags", "front_page".to_string()),
                        ("hitsPerPage", limit.to_string()),
                    ])
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| ProviderError::Unavailable(format!("hackernews get: {e}")))?;
                if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(ProviderError::RateLimited);
                }
                let resp = resp
                    .error_for_status()
                    .map_err(|e| ProviderError::Unavailable(format!("hackernews status: {e}")))?;
                let body = resp
                    .text()
                    .await
                    .map_err(|e| ProviderError::Unavailable(format!("hackernews body: {e}")))?;
                Self::parse_hits(&body, limit)
            }
        }
    }

    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn display_name(&self) -> &'static str {
        "Hacker News"
    }
}
