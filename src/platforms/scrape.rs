// Scraping API client — unauthenticated-to-us, key-authenticated HTTP access
// to recent public posts per platform.
//
// A thin reqwest wrapper with a generic GET helper; the per-platform
// adapters share one client and differ only in the platform path segment
// the API expects.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::{Platform, PlatformAdapter};
use crate::content::{ContentItem, MediaKind, MediaRef};

/// HTTP client for the social scraping API.
pub struct ScrapeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ScrapeClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("greenlight/0.1 (creator-vetting)")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Make a GET request to an API path and deserialize the response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);

        debug!(path = path, "Scrape API GET request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("Scrape API request failed: {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Scrape API {path} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize {path} response"))
    }
}

// -- Serde types for the posts endpoint --

#[derive(Debug, Deserialize)]
struct PostsResponse {
    posts: Vec<ScrapedPost>,
}

#[derive(Debug, Deserialize)]
struct ScrapedPost {
    id: String,
    caption: Option<String>,
    transcript: Option<String>,
    media_url: Option<String>,
    media_type: Option<String>,
    posted_at: Option<String>,
}

/// Live adapter for one platform, backed by the shared scraping client.
pub struct ScrapeAdapter {
    platform: Platform,
    client: Arc<ScrapeClient>,
}

impl ScrapeAdapter {
    pub fn new(platform: Platform, client: Arc<ScrapeClient>) -> Self {
        Self { platform, client }
    }
}

#[async_trait]
impl PlatformAdapter for ScrapeAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_posts(&self, handle: &str, lookback_months: u32) -> Result<Vec<ContentItem>> {
        let since = (Utc::now() - Duration::days(30 * lookback_months as i64)).to_rfc3339();
        let path = format!("v1/{}/posts", self.platform.as_str());

        let response: PostsResponse = self
            .client
            .get(&path, &[("handle", handle), ("since", &since)])
            .await
            .with_context(|| format!("Failed to fetch {} posts for @{handle}", self.platform))?;

        let items: Vec<ContentItem> = response
            .posts
            .into_iter()
            .map(|post| ContentItem {
                id: post.id,
                platform: self.platform,
                caption: post.caption.unwrap_or_default(),
                transcript: post.transcript,
                media: media_ref(post.media_url, post.media_type.as_deref()),
                posted_at: post
                    .posted_at
                    .and_then(|t| chrono::DateTime::parse_from_rfc3339(&t).ok())
                    .map(|t| t.with_timezone(&Utc)),
            })
            .collect();

        info!(
            count = items.len(),
            platform = %self.platform,
            handle = handle,
            "Fetched posts for analysis"
        );

        Ok(items)
    }
}

fn media_ref(url: Option<String>, kind: Option<&str>) -> Option<MediaRef> {
    let url = url?;
    let kind = match kind {
        Some("video") => MediaKind::Video,
        // Anything with a media URL but no declared type gets treated as an
        // image — still pre-screened, just never transcribed.
        _ => MediaKind::Image,
    };
    Some(MediaRef { url, kind })
}
