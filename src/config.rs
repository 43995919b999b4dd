use std::env;
use std::str::FromStr;

use anyhow::Result;

/// Per-dependency concurrency bounds and request-rate ceilings.
///
/// Every external dependency gets its own pool so a slow provider can't
/// starve the others. Rates are requests per second; `None` means the pool
/// only bounds concurrency.
#[derive(Debug, Clone)]
pub struct PipelineLimits {
    /// Creators processed concurrently per batch run.
    pub creator_concurrency: usize,
    /// Pacing delay applied between admissions once the window is full.
    pub wave_delay_ms: u64,
    pub video_concurrency: usize,
    pub video_rps: f64,
    pub image_concurrency: usize,
    pub image_rps: f64,
    pub brand_concurrency: usize,
    pub scrape_concurrency: usize,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            creator_concurrency: 25,
            wave_delay_ms: 0,
            video_concurrency: 25,
            video_rps: 25.0,
            image_concurrency: 50,
            image_rps: 50.0,
            brand_concurrency: 20,
            scrape_concurrency: 15,
        }
    }
}

/// Retry knobs read from the environment for completeness.
///
/// Nothing consumes these yet — no call site performs retries, and none is
/// invented here. They are carried so operators setting them see them echoed
/// in `status` output rather than silently ignored.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file is
/// loaded automatically at startup via dotenvy. The loaded value is
/// immutable and passed into constructors — no module reads ambient state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Social scraping API (platform post retrieval).
    pub scrape_api_url: String,
    pub scrape_api_key: String,
    /// Brand/ad detection model endpoint (text LLM).
    pub brand_api_url: String,
    pub brand_api_key: String,
    pub brand_model: String,
    /// Thumbnail pre-screening endpoint (cheap vision model).
    pub vision_api_url: String,
    pub vision_api_key: String,
    /// Full media analysis provider.
    pub media_api_url: String,
    pub media_api_key: String,
    /// Background search endpoint (news / public-record lookups).
    pub search_api_url: String,
    pub search_api_key: String,
    pub db_path: String,
    /// How far back to fetch posts, in months.
    pub lookback_months: u32,
    /// Pre-screen confidence required before a visual asset may skip full
    /// analysis. Anything below routes toward more scrutiny.
    pub prescreen_confidence_threshold: f64,
    /// Competitor brand names checked against detected brand mentions.
    pub competitor_brands: Vec<String>,
    pub limits: PipelineLimits,
    pub retry: RetrySettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only db_path and the tuning knobs have defaults — provider endpoints
    /// default to empty, and each dependent tier degrades gracefully when
    /// its credentials are missing.
    pub fn load() -> Result<Self> {
        let limits = PipelineLimits {
            creator_concurrency: env_parse("GREENLIGHT_CREATOR_CONCURRENCY", 25),
            wave_delay_ms: env_parse("GREENLIGHT_WAVE_DELAY_MS", 0),
            video_concurrency: env_parse("GREENLIGHT_VIDEO_CONCURRENCY", 25),
            video_rps: env_parse("GREENLIGHT_VIDEO_RPS", 25.0),
            image_concurrency: env_parse("GREENLIGHT_IMAGE_CONCURRENCY", 50),
            image_rps: env_parse("GREENLIGHT_IMAGE_RPS", 50.0),
            brand_concurrency: env_parse("GREENLIGHT_BRAND_CONCURRENCY", 20),
            scrape_concurrency: env_parse("GREENLIGHT_SCRAPE_CONCURRENCY", 15),
        };

        let retry = RetrySettings {
            max_attempts: env_parse("GREENLIGHT_RETRY_MAX_ATTEMPTS", 3),
            base_delay_ms: env_parse("GREENLIGHT_RETRY_BASE_DELAY_MS", 1000),
        };

        let competitor_brands = env::var("GREENLIGHT_COMPETITOR_BRANDS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            scrape_api_url: env::var("GREENLIGHT_SCRAPE_API_URL").unwrap_or_default(),
            scrape_api_key: env::var("GREENLIGHT_SCRAPE_API_KEY").unwrap_or_default(),
            brand_api_url: env::var("GREENLIGHT_BRAND_API_URL").unwrap_or_default(),
            brand_api_key: env::var("GREENLIGHT_BRAND_API_KEY").unwrap_or_default(),
            brand_model: env::var("GREENLIGHT_BRAND_MODEL")
                .unwrap_or_else(|_| "brand-detect-small".to_string()),
            vision_api_url: env::var("GREENLIGHT_VISION_API_URL").unwrap_or_default(),
            vision_api_key: env::var("GREENLIGHT_VISION_API_KEY").unwrap_or_default(),
            media_api_url: env::var("GREENLIGHT_MEDIA_API_URL").unwrap_or_default(),
            media_api_key: env::var("GREENLIGHT_MEDIA_API_KEY").unwrap_or_default(),
            search_api_url: env::var("GREENLIGHT_SEARCH_API_URL").unwrap_or_default(),
            search_api_key: env::var("GREENLIGHT_SEARCH_API_KEY").unwrap_or_default(),
            db_path: env::var("GREENLIGHT_DB_PATH")
                .unwrap_or_else(|_| "./greenlight.db".to_string()),
            lookback_months: env_parse("GREENLIGHT_LOOKBACK_MONTHS", 6),
            prescreen_confidence_threshold: env_parse("GREENLIGHT_PRESCREEN_THRESHOLD", 0.7),
            competitor_brands,
            limits,
            retry,
        })
    }

    /// Check that the scraping API is configured.
    /// Call this before any batch run that needs live platform fetches.
    pub fn require_scrape(&self) -> Result<()> {
        if self.scrape_api_url.is_empty() {
            anyhow::bail!(
                "GREENLIGHT_SCRAPE_API_URL not set. Add it to your .env file.\n\
                 Live platform fetching needs a scraping API endpoint."
            );
        }
        Ok(())
    }

    pub fn brand_detection_configured(&self) -> bool {
        !self.brand_api_url.is_empty() && !self.brand_api_key.is_empty()
    }

    pub fn prescreen_configured(&self) -> bool {
        !self.vision_api_url.is_empty() && !self.vision_api_key.is_empty()
    }

    pub fn media_analysis_configured(&self) -> bool {
        !self.media_api_url.is_empty() && !self.media_api_key.is_empty()
    }

    pub fn search_configured(&self) -> bool {
        !self.search_api_url.is_empty() && !self.search_api_key.is_empty()
    }
}

/// Parse an env var, falling back to a default when unset or malformed.
fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_documented_values() {
        let l = PipelineLimits::default();
        assert_eq!(l.creator_concurrency, 25);
        assert_eq!(l.video_concurrency, 25);
        assert_eq!(l.video_rps, 25.0);
        assert_eq!(l.image_concurrency, 50);
        assert_eq!(l.image_rps, 50.0);
        assert_eq!(l.brand_concurrency, 20);
        assert_eq!(l.scrape_concurrency, 15);
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("GREENLIGHT_TEST_PARSE", "not-a-number");
        let v: u32 = env_parse("GREENLIGHT_TEST_PARSE", 7);
        assert_eq!(v, 7);
        std::env::remove_var("GREENLIGHT_TEST_PARSE");
    }
}
