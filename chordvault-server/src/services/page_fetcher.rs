//! Page-automation boundary
//!
//! The scraping sidecar drives a real browser and hands back raw
//! `{title, url}` link pairs and chord-sheet bodies. This module only
//! defines the trait and a rate-limited JSON-over-HTTP implementation.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chordvault_common::config::ScraperConfig;

use super::normalizer::RawChordSheet;

const USER_AGENT: &str = concat!("ChordVault/", env!("CARGO_PKG_VERSION"));

/// Raw link as scraped from a results page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawLink {
    pub title: String,
    pub url: String,
}

impl RawLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// What a search is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Artist,
    Song,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Artist => "artist",
            SearchKind::Song => "song",
        }
    }
}

/// Out-of-process page automation
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Result links of a site search
    async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<RawLink>>;

    /// Song links listed on an artist page
    async fn artist_links(&self, artist_path: &str) -> Result<Vec<RawLink>>;

    /// Chord sheet page; `None` when the site has no such page
    async fn chord_sheet(&self, sheet_path: &str) -> Result<Option<RawChordSheet>>;
}

/// JSON-over-HTTP client for the scraping sidecar
pub struct HttpPageFetcher {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpPageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = governor::RateLimiter::direct(governor::Quota::per_second(per_second));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build scraper HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Option<reqwest::Response>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, ?query, "Querying scraper sidecar");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Scraper request to {} failed", endpoint))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Scraper returned {} for {}: {}", status, endpoint, body);
        }
        Ok(Some(response))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<RawLink>> {
        match self.get("search", &[("q", query), ("type", kind.as_str())]).await? {
            Some(response) => response
                .json()
                .await
                .context("Failed to parse scraper search response"),
            None => Ok(Vec::new()),
        }
    }

    async fn artist_links(&self, artist_path: &str) -> Result<Vec<RawLink>> {
        match self.get("artist", &[("path", artist_path)]).await? {
            Some(response) => response
                .json()
                .await
                .context("Failed to parse scraper artist response"),
            None => Ok(Vec::new()),
        }
    }

    async fn chord_sheet(&self, sheet_path: &str) -> Result<Option<RawChordSheet>> {
        match self.get("sheet", &[("path", sheet_path)]).await? {
            Some(response) => {
                let sheet = response
                    .json()
                    .await
                    .context("Failed to parse scraper sheet response")?;
                Ok(Some(sheet))
            }
            None => Ok(None),
        }
    }
}
