// Content fetching — per-creator retrieval of recent posts across platforms.
//
// The pre-transcribed content cache is consulted first; a non-empty hit
// satisfies the platform without a live fetch. Each platform is isolated:
// one platform failing records an error on that platform's result and never
// fails the creator as a whole.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::analysis::rate_limit::Pool;
use crate::db::models::CachedPost;
use crate::db::Database;
use crate::error::PipelineError;
use crate::events::{EventBus, StreamEvent};
use crate::platforms::{AdapterSet, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Reference to a post's visual asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
}

/// A single fetched post — the fields the analysis tiers depend on.
/// Ephemeral: not persisted beyond what feeds findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub platform: Platform,
    pub caption: String,
    pub transcript: Option<String>,
    pub media: Option<MediaRef>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    pub fn has_text(&self) -> bool {
        !self.caption.trim().is_empty()
            || self.transcript.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// One platform's fetch outcome for a creator.
#[derive(Debug, Clone)]
pub struct PlatformFetch {
    pub platform: Platform,
    pub handle: String,
    pub items: Vec<ContentItem>,
    pub from_cache: bool,
    pub error: Option<PipelineError>,
}

/// Fetch a creator's content across all resolved (platform, handle) pairs.
///
/// Cross-platform concurrency for one creator rides the shared scraping
/// pool, independent of how many creators are in flight.
pub async fn fetch_creator_content(
    db: &Arc<dyn Database>,
    adapters: &AdapterSet,
    scrape_pool: &Pool,
    bus: &EventBus,
    creator_id: &str,
    targets: &[(Platform, String)],
    lookback_months: u32,
) -> Vec<PlatformFetch> {
    stream::iter(targets.iter().cloned().map(|(platform, handle)| {
        let db = db.clone();
        async move {
            bus.publish(StreamEvent::PlatformStarted {
                creator_id: creator_id.to_string(),
                platform: platform.as_str().to_string(),
                timestamp: Utc::now(),
            });
            let started = Instant::now();

            let fetch =
                fetch_one_platform(&db, adapters, scrape_pool, platform, &handle, lookback_months)
                    .await;

            let db_status = if fetch.error.is_some() {
                "FAILED"
            } else {
                "COMPLETED"
            };
            if let Err(e) = db
                .set_platform_status(creator_id, platform.as_str(), db_status)
                .await
            {
                warn!(error = %e, platform = %platform, "Failed to record platform status");
            }

            bus.publish(StreamEvent::PlatformCompleted {
                creator_id: creator_id.to_string(),
                platform: platform.as_str().to_string(),
                posts_count: fetch.items.len() as u32,
                duration_ms: started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });

            fetch
        }
    }))
    .buffer_unordered(targets.len().max(1))
    .collect()
    .await
}

async fn fetch_one_platform(
    db: &Arc<dyn Database>,
    adapters: &AdapterSet,
    scrape_pool: &Pool,
    platform: Platform,
    handle: &str,
    lookback_months: u32,
) -> PlatformFetch {
    // Cache first — a non-empty hit skips the live fetch entirely
    match db
        .get_cached_posts(handle, platform.as_str(), lookback_months)
        .await
    {
        Ok(cached) if !cached.is_empty() => {
            debug!(
                count = cached.len(),
                platform = %platform,
                handle = handle,
                "Content cache hit, skipping live fetch"
            );
            return PlatformFetch {
                platform,
                handle: handle.to_string(),
                items: cached.iter().map(|p| cached_to_item(platform, p)).collect(),
                from_cache: true,
                error: None,
            };
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, platform = %platform, "Cache lookup failed, falling back to live fetch");
        }
    }

    let adapter = match adapters.get(platform) {
        Some(a) => a,
        None => {
            return PlatformFetch {
                platform,
                handle: handle.to_string(),
                items: Vec::new(),
                from_cache: false,
                error: Some(PipelineError::Fetch(format!(
                    "no adapter registered for {platform}"
                ))),
            }
        }
    };

    let _permit = match scrape_pool.acquire().await {
        Ok(p) => p,
        Err(e) => {
            return PlatformFetch {
                platform,
                handle: handle.to_string(),
                items: Vec::new(),
                from_cache: false,
                error: Some(PipelineError::fetch(e)),
            }
        }
    };

    match adapter.fetch_posts(handle, lookback_months).await {
        Ok(items) => PlatformFetch {
            platform,
            handle: handle.to_string(),
            items,
            from_cache: false,
            error: None,
        },
        Err(e) => {
            warn!(error = %e, platform = %platform, handle = handle, "Platform fetch failed");
            PlatformFetch {
                platform,
                handle: handle.to_string(),
                items: Vec::new(),
                from_cache: false,
                error: Some(PipelineError::fetch(e)),
            }
        }
    }
}

fn cached_to_item(platform: Platform, post: &CachedPost) -> ContentItem {
    let media = post.media_url.as_ref().map(|url| MediaRef {
        url: url.clone(),
        kind: match post.media_kind.as_deref() {
            Some("video") => MediaKind::Video,
            _ => MediaKind::Image,
        },
    });
    ContentItem {
        id: post.id.clone(),
        platform,
        caption: post.caption.clone().unwrap_or_default(),
        transcript: post.transcript.clone(),
        media,
        posted_at: DateTime::parse_from_rfc3339(&post.posted_at)
            .map(|t| t.with_timezone(&Utc))
            .ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_text() {
        let mut item = ContentItem {
            id: "1".to_string(),
            platform: Platform::Instagram,
            caption: "  ".to_string(),
            transcript: None,
            media: None,
            posted_at: None,
        };
        assert!(!item.has_text());
        item.transcript = Some("spoken words".to_string());
        assert!(item.has_text());
        item.transcript = None;
        item.caption = "a caption".to_string();
        assert!(item.has_text());
    }

    #[test]
    fn test_cached_post_conversion() {
        let post = CachedPost {
            id: "p1".to_string(),
            handle: "h".to_string(),
            platform: "tiktok".to_string(),
            caption: None,
            transcript: Some("hello world".to_string()),
            media_url: Some("https://cdn.example/v.mp4".to_string()),
            media_kind: Some("video".to_string()),
            posted_at: "2026-07-01T12:00:00Z".to_string(),
            cached_at: String::new(),
        };
        let item = cached_to_item(Platform::TikTok, &post);
        assert_eq!(item.caption, "");
        assert_eq!(item.transcript.as_deref(), Some("hello world"));
        assert_eq!(item.media.as_ref().unwrap().kind, MediaKind::Video);
        assert!(item.posted_at.is_some());
    }
}
