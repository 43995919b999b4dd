// Tier 3 — thumbnail pre-screening.
//
// One cheap vision call per visual asset decides whether the expensive full
// analysis is needed. The gate fails open: only a confident "safe" skips
// tier 4. Any other classification, any parse failure, and any missing
// configuration all route toward more scrutiny.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;

/// Classification of a pre-screened asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreScreenReason {
    Safe,
    BrandsDetected,
    Uncertain,
    Concerning,
}

impl PreScreenReason {
    pub fn parse(s: &str) -> Self {
        match s {
            "safe" => PreScreenReason::Safe,
            "brands_detected" => PreScreenReason::BrandsDetected,
            "concerning" => PreScreenReason::Concerning,
            // Unknown labels route toward more analysis
            _ => PreScreenReason::Uncertain,
        }
    }
}

/// The outcome of pre-screening one visual asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreScreenResult {
    pub needs_full_analysis: bool,
    pub reason: PreScreenReason,
    /// Model confidence in the classification, 0.0 to 1.0.
    pub confidence: f64,
    pub detected_brands: Vec<String>,
}

impl PreScreenResult {
    /// Apply the gating policy: only `safe` at or above the configured
    /// confidence threshold authorizes skipping full analysis.
    pub fn new(
        reason: PreScreenReason,
        confidence: f64,
        detected_brands: Vec<String>,
        threshold: f64,
    ) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        let needs_full_analysis = !(reason == PreScreenReason::Safe && confidence >= threshold);
        Self {
            needs_full_analysis,
            reason,
            confidence,
            detected_brands,
        }
    }

    /// The conservative default used when the pre-screen call itself fails.
    pub fn needs_analysis_fallback() -> Self {
        Self {
            needs_full_analysis: true,
            reason: PreScreenReason::Uncertain,
            confidence: 0.0,
            detected_brands: Vec::new(),
        }
    }
}

/// Trait for thumbnail pre-screening.
#[async_trait]
pub trait VisionPreScreener: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    /// Pre-screen one representative frame/image.
    async fn prescreen(&self, image_url: &str) -> Result<PreScreenResult>;
}

/// Used when vision credentials are absent. Pre-screening disabled means
/// every visual asset is treated as needing full analysis.
pub struct DisabledPreScreener;

#[async_trait]
impl VisionPreScreener for DisabledPreScreener {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn prescreen(&self, _image_url: &str) -> Result<PreScreenResult> {
        Err(PipelineError::Config("vision pre-screening is not configured".into()).into())
    }
}

/// Hosted vision-model pre-screener.
pub struct HttpPreScreener {
    client: Client,
    base_url: String,
    api_key: String,
    confidence_threshold: f64,
}

impl HttpPreScreener {
    pub fn new(base_url: &str, api_key: &str, confidence_threshold: f64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            confidence_threshold,
        })
    }
}

#[async_trait]
impl VisionPreScreener for HttpPreScreener {
    async fn prescreen(&self, image_url: &str) -> Result<PreScreenResult> {
        let url = format!("{}/v1/prescreen", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&PreScreenRequest {
                image_url: image_url.to_string(),
            })
            .send()
            .await
            .context("Failed to call vision pre-screen")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Vision pre-screen returned {status}: {body}");
        }

        let raw: PreScreenResponse = response
            .json()
            .await
            .context("Failed to parse pre-screen response")?;

        let result = PreScreenResult::new(
            PreScreenReason::parse(&raw.reason),
            raw.confidence,
            raw.brands.unwrap_or_default(),
            self.confidence_threshold,
        );

        debug!(
            reason = ?result.reason,
            confidence = result.confidence,
            needs_full = result.needs_full_analysis,
            "Pre-screened asset"
        );

        Ok(result)
    }
}

#[derive(Serialize)]
struct PreScreenRequest {
    image_url: String,
}

#[derive(Deserialize)]
struct PreScreenResponse {
    reason: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    brands: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confident_safe_skips_full_analysis() {
        let r = PreScreenResult::new(PreScreenReason::Safe, 0.9, vec![], 0.7);
        assert!(!r.needs_full_analysis);
    }

    #[test]
    fn test_unconfident_safe_is_analyzed() {
        let r = PreScreenResult::new(PreScreenReason::Safe, 0.5, vec![], 0.7);
        assert!(r.needs_full_analysis);
    }

    #[test]
    fn test_non_safe_reasons_always_analyzed() {
        for reason in [
            PreScreenReason::BrandsDetected,
            PreScreenReason::Uncertain,
            PreScreenReason::Concerning,
        ] {
            // Even at full confidence
            let r = PreScreenResult::new(reason, 1.0, vec![], 0.7);
            assert!(r.needs_full_analysis, "{reason:?} must gate in");
        }
    }

    #[test]
    fn test_uncertain_low_confidence_analyzed_at_any_threshold() {
        for threshold in [0.0, 0.3, 0.7, 1.0] {
            let r = PreScreenResult::new(PreScreenReason::Uncertain, 0.3, vec![], threshold);
            assert!(r.needs_full_analysis);
        }
    }

    #[test]
    fn test_gating_is_monotonic_in_threshold() {
        // Raising the threshold never increases the set of skipped assets
        let confidences = [0.0, 0.2, 0.5, 0.69, 0.7, 0.9, 1.0];
        let mut last_skipped = usize::MAX;
        for threshold in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let skipped = confidences
                .iter()
                .filter(|&&c| {
                    !PreScreenResult::new(PreScreenReason::Safe, c, vec![], threshold)
                        .needs_full_analysis
                })
                .count();
            assert!(skipped <= last_skipped);
            last_skipped = skipped;
        }
    }

    #[test]
    fn test_unknown_reason_parses_to_uncertain() {
        assert_eq!(PreScreenReason::parse("banana"), PreScreenReason::Uncertain);
        assert_eq!(PreScreenReason::parse("safe"), PreScreenReason::Safe);
        assert_eq!(
            PreScreenReason::parse("brands_detected"),
            PreScreenReason::BrandsDetected
        );
    }

    #[test]
    fn test_fallback_needs_analysis() {
        assert!(PreScreenResult::needs_analysis_fallback().needs_full_analysis);
    }
}
