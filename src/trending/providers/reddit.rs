// src/trending/providers/reddit.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use metrics::histogram;
use serde::Deserialize;

use crate::trending::clean_title;
use crate::trending::error::ProviderError;
use crate::trending::types::{TrendingItem, TrendSource};

const SOURCE_ID: &str = "reddit";
const LISTING_URL: &str = "https://www.reddit.com/r/popular.json";
const USER_AGENT: &str = "trending-aggregator/0.1";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: Option<String>,
    title: Option<String>,
    permalink: Option<String>,
    score: Option<f64>,
}

/// Link-forum adapter over the Reddit `r/popular` listing.
pub struct RedditProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RedditProvider {
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

    /// Parse a listing body into items, best-ranked first. Posts missing a
    /// title or permalink are skipped, matching the upstream payload's
    /// promoted/deleted entries.
    pub fn parse_listing(body: &str, limit: usize) -> Result<Vec<TrendingItem>, ProviderError> {
        let t0 = std::time::Instant::now();
        let listing: Listing = serde_json::from_str(body)
            .map_err(|e| ProviderError::Protocol(format!("reddit listing json: {e}")))?;

        let fetched_at = Utc::now();
        let mut out = Vec::with_capacity(listing.data.children.len().min(limit));
        for child in listing.data.children.into_iter() {
            if out.len() == limit {
                break;
            }
            let post = child.data;
            let (Some(title), Some(permalink)) = (post.title, post.permalink) else {
                continue;
            };
            let external_id = match post.id {
                Some(id) => id,
                None => permalink.clone(),
            };
            out.push(TrendingItem {
                source_id: SOURCE_ID.to_string(),
                external_id,
                title: clean_title(&title),
                url: format!("https://www.reddit.com{permalink}"),
                score: post.score.unwrap_or(0.0),
                fetched_at,
            });
        }

        histogram!("trending_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl TrendSource for RedditProvider {
    async fn fetch(
        &self,
        limit: usize,
        timeout: Duration,
    ) -> Result<Vec<TrendingItem>, ProviderError> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_listing(body, limit),
            Mode::Http { client } => {
                let resp = client
                    .get(LISTING_URL)
                    .query(&[("limit", limit.to_string())])
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| ProviderError::Unavailable(format!("reddit get: {e}")))?;
                if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(ProviderError::RateLimited);
                }
                let resp = resp
                    .error_for_status()
                    .map_err(|e| ProviderError::Unavailable(format!("reddit status: {e}")))?;
                let body = resp
                    .text()
                    .await
                    .map_err(|e| ProviderError::Unavailable(format!("reddit body: {e}")))?;
                Self::parse_listing(&body, limit)
            }
        }
    }

    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn display_name(&self) -> &'static str {
        "Reddit r/popular"
    }
}
