// Platform adapters — one implementation per supported social platform.
//
// Platform selection is a closed enum: a profile URL resolves to a
// (platform, handle) pair exactly once, up front, and everything downstream
// dispatches on the enum. Arbitrary URL string matching never reaches the
// fetch path.

pub mod scrape;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::content::ContentItem;

/// The closed set of supported platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    TikTok,
    YouTube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
        }
    }

    pub fn all() -> [Platform; 3] {
        [Platform::Instagram, Platform::TikTok, Platform::YouTube]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolve a profile URL to its platform and handle.
///
/// Pure and total over the closed platform set: an unrecognized host or a
/// post-style URL (single photo/video rather than a profile) returns None
/// and is reported during the validation step.
pub fn resolve_link(url: &str) -> Option<(Platform, String)> {
    let trimmed = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))
        .unwrap_or_else(|| url.trim());
    let trimmed = trimmed.strip_prefix("www.").unwrap_or(trimmed);

    let (host, path) = trimmed.split_once('/')?;
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let first = segments.next()?;

    match host {
        "instagram.com" => {
            // Post-style paths are not profiles
            if matches!(first, "p" | "reel" | "reels" | "stories" | "explore") {
                return None;
            }
            Some((Platform::Instagram, first.trim_end_matches('/').to_string()))
        }
        "tiktok.com" => first
            .strip_prefix('@')
            .map(|h| (Platform::TikTok, h.to_string())),
        "youtube.com" => {
            if let Some(h) = first.strip_prefix('@') {
                return Some((Platform::YouTube, h.to_string()));
            }
            match first {
                "channel" | "c" | "user" => segments
                    .next()
                    .map(|h| (Platform::YouTube, h.to_string())),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Per-platform fetch capability.
///
/// Implementations are selected by the `Platform` enum via `AdapterSet`;
/// the HTTP implementations share one thin scraping-API client.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Resolve a profile URL to a bare handle. The default delegates to the
    /// pure link parser; adapters with a remote lookup can override.
    async fn resolve_handle(&self, url: &str) -> Result<String> {
        match resolve_link(url) {
            Some((platform, handle)) if platform == self.platform() => Ok(handle),
            _ => anyhow::bail!("Not a {} profile URL: {url}", self.platform()),
        }
    }

    /// Recent posts for a handle within the lookback window, newest first.
    async fn fetch_posts(&self, handle: &str, lookback_months: u32) -> Result<Vec<ContentItem>>;
}

/// The closed adapter set for a pipeline run, keyed by platform.
pub struct AdapterSet {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
}

impl AdapterSet {
    pub fn new(adapters: Vec<Arc<dyn PlatformAdapter>>) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.platform(), a)).collect(),
        }
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform)
    }

    /// Build the live HTTP adapters from configuration.
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let client = Arc::new(scrape::ScrapeClient::new(
            &config.scrape_api_url,
            &config.scrape_api_key,
        )?);
        Ok(Self::new(vec![
            Arc::new(scrape::ScrapeAdapter::new(Platform::Instagram, client.clone())),
            Arc::new(scrape::ScrapeAdapter::new(Platform::TikTok, client.clone())),
            Arc::new(scrape::ScrapeAdapter::new(Platform::YouTube, client)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_instagram_profile() {
        assert_eq!(
            resolve_link("https://www.instagram.com/somecreator/"),
            Some((Platform::Instagram, "somecreator".to_string()))
        );
        assert_eq!(
            resolve_link("http://instagram.com/other.name"),
            Some((Platform::Instagram, "other.name".to_string()))
        );
    }

    #[test]
    fn test_instagram_post_urls_are_not_profiles() {
        assert_eq!(resolve_link("https://instagram.com/p/Cxyz123/"), None);
        assert_eq!(resolve_link("https://instagram.com/reel/Cxyz123/"), None);
    }

    #[test]
    fn test_resolve_tiktok_handle() {
        assert_eq!(
            resolve_link("https://www.tiktok.com/@dancequeen"),
            Some((Platform::TikTok, "dancequeen".to_string()))
        );
        // TikTok profiles always carry the @ prefix
        assert_eq!(resolve_link("https://tiktok.com/trending"), None);
    }

    #[test]
    fn test_resolve_youtube_variants() {
        assert_eq!(
            resolve_link("https://youtube.com/@techreviews"),
            Some((Platform::YouTube, "techreviews".to_string()))
        );
        assert_eq!(
            resolve_link("https://www.youtube.com/channel/UCabc123"),
            Some((Platform::YouTube, "UCabc123".to_string()))
        );
        assert_eq!(
            resolve_link("https://youtube.com/c/OldStyleName"),
            Some((Platform::YouTube, "OldStyleName".to_string()))
        );
        // A bare watch link is not a profile
        assert_eq!(resolve_link("https://youtube.com/watch?v=abc"), None);
    }

    #[test]
    fn test_unknown_hosts_are_rejected() {
        assert_eq!(resolve_link("https://example.com/whatever"), None);
        assert_eq!(resolve_link("not a url at all"), None);
    }
}
