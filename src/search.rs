// Background search — non-content risk signals for a creator.
//
// Queries an external search index (news, public records) by creator name
// and maps hits to findings (court cases, news articles, social
// controversy). Runs alongside content fetching; a search failure is logged
// and yields no findings rather than failing the creator.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::db::models::{Finding, FindingType, Severity};
use crate::error::PipelineError;
use crate::output::truncate_chars;

/// One search result hit.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    /// Provider's own categorization ("court", "news", "social", ...).
    #[serde(default)]
    pub category: String,
}

/// Trait for the background search source.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    /// The source label carried on search events ("news").
    fn source(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Used when search credentials are absent.
pub struct DisabledSearchProvider;

#[async_trait]
impl SearchProvider for DisabledSearchProvider {
    fn is_enabled(&self) -> bool {
        false
    }

    fn source(&self) -> &str {
        "disabled"
    }

    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
        Err(PipelineError::Config("background search is not configured".into()).into())
    }
}

/// Hosted search index client.
pub struct HttpSearchProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpSearchProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    fn source(&self) -> &str {
        "news"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!("{}/v1/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Search request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Search returned {status} for query {query:?}");
        }

        let results: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;
        Ok(results.results)
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

/// Map search hits to findings.
///
/// The provider's category string decides the finding type and a baseline
/// severity; anything unrecognized lands as a low-severity "other".
pub fn hits_to_findings(hits: &[SearchHit]) -> Vec<Finding> {
    hits.iter()
        .map(|hit| {
            let (finding_type, severity) = match hit.category.as_str() {
                "court" | "legal" => (FindingType::CourtCase, Severity::High),
                "news" => (FindingType::NewsArticle, Severity::Medium),
                "social" | "controversy" => (FindingType::SocialControversy, Severity::Medium),
                _ => (FindingType::Other, Severity::Low),
            };
            Finding {
                finding_type,
                severity,
                title: hit.title.clone(),
                summary: truncate_chars(&hit.snippet, 240),
                source: hit.url.clone(),
            }
        })
        .collect()
}
