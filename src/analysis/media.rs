// Tier 4 — full media analysis.
//
// The expensive tier: transcript extraction, frame-level logo/brand
// detection, and category-scored content classification, run by an external
// provider. Only assets gated in by the tier-3 pre-screen reach this point.
//
// The provider is asynchronous on its side: submit returns a job id, and the
// result is fetched by that id. list_completed exists for the recovery
// reconciler, which relinks results whose local write was lost.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ContentCategory, Evidence, Modality};
use crate::db::models::Severity;
use crate::error::PipelineError;

/// A transcribed span of the asset's audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

/// How prominently a logo appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoProminence {
    Primary,
    Secondary,
    Background,
}

/// One logo/brand appearance in the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoDetection {
    pub brand: String,
    pub prominence: LogoProminence,
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

/// One scored content category with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: ContentCategory,
    /// 0–100.
    pub score: u32,
    pub evidence: Vec<Evidence>,
}

/// The full analysis result for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAnalysis {
    pub provider_id: String,
    pub transcript: Vec<TranscriptSegment>,
    pub logo_detections: Vec<LogoDetection>,
    pub content_classification: Vec<CategoryScore>,
}

/// A completed analysis listed by the provider, independent of whether we
/// ever recorded it locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedAnalysis {
    pub provider_id: String,
    pub asset_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Trait for the full media analysis provider.
#[async_trait]
pub trait MediaAnalyzer: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    /// Submit an asset for analysis; returns the provider's job id.
    async fn submit(&self, asset_url: &str) -> Result<String>;

    /// Fetch the result for a previously submitted job.
    async fn fetch_result(&self, provider_id: &str) -> Result<MediaAnalysis>;

    /// All analyses the provider has finished, newest first.
    async fn list_completed(&self) -> Result<Vec<CompletedAnalysis>>;
}

/// Used when media-analysis credentials are absent. The tier is skipped
/// gracefully: pre-screened assets simply never reach a provider.
pub struct DisabledMediaAnalyzer;

#[async_trait]
impl MediaAnalyzer for DisabledMediaAnalyzer {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn submit(&self, _asset_url: &str) -> Result<String> {
        Err(PipelineError::Config("media analysis is not configured".into()).into())
    }

    async fn fetch_result(&self, _provider_id: &str) -> Result<MediaAnalysis> {
        Err(PipelineError::Config("media analysis is not configured".into()).into())
    }

    async fn list_completed(&self) -> Result<Vec<CompletedAnalysis>> {
        Err(PipelineError::Config("media analysis is not configured".into()).into())
    }
}

/// HTTP client for the hosted media analysis provider.
pub struct HttpMediaAnalyzer {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpMediaAnalyzer {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            // Full analysis responses are large; give them more room than
            // the cheap tiers but still bound the wait.
            .timeout(std::time::Duration::from_secs(60))
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
impl MediaAnalyzer for HttpMediaAnalyzer {
    async fn submit(&self, asset_url: &str) -> Result<String> {
        let url = format!("{}/v1/analyses", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&SubmitRequest {
                asset_url: asset_url.to_string(),
            })
            .send()
            .await
            .context("Failed to submit asset for analysis")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Analysis submit returned {status}: {body}");
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .context("Failed to parse submit response")?;
        debug!(job_id = submitted.id, "Submitted asset for full analysis");
        Ok(submitted.id)
    }

    async fn fetch_result(&self, provider_id: &str) -> Result<MediaAnalysis> {
        let url = format!("{}/v1/analyses/{provider_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to fetch analysis {provider_id}"))?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Analysis fetch for {provider_id} returned {status}");
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse analysis {provider_id}"))
    }

    async fn list_completed(&self) -> Result<Vec<CompletedAnalysis>> {
        let url = format!("{}/v1/analyses", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("status", "completed")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to list completed analyses")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Analysis listing returned {status}");
        }

        let listing: ListResponse = response
            .json()
            .await
            .context("Failed to parse analysis listing")?;
        Ok(listing.analyses)
    }
}

#[derive(Serialize)]
struct SubmitRequest {
    asset_url: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Deserialize)]
struct ListResponse {
    analyses: Vec<CompletedAnalysis>,
}

/// Category scores above this are significant enough to synthesize evidence
/// even when the provider attached none.
const SCORE_EVIDENCE_FLOOR: u32 = 50;

/// Flatten an analysis into evidence for aggregation.
///
/// Provider-attached evidence passes through unchanged; a high category
/// score with no attached evidence still produces one synthetic item so the
/// score can't silently vanish from the report.
pub fn analysis_to_evidence(analysis: &MediaAnalysis) -> Vec<Evidence> {
    let mut evidence = Vec::new();
    for scored in &analysis.content_classification {
        if !scored.evidence.is_empty() {
            evidence.extend(scored.evidence.iter().cloned());
        } else if scored.score >= SCORE_EVIDENCE_FLOOR {
            evidence.push(Evidence {
                category: scored.category,
                severity: severity_for_score(scored.score),
                start_seconds: None,
                end_seconds: None,
                quote: format!("{} scored {}/100", scored.category, scored.score),
                modality: Modality::Visual,
            });
        }
    }
    evidence
}

fn severity_for_score(score: u32) -> Severity {
    match score {
        s if s >= 80 => Severity::High,
        s if s >= 50 => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Confidence assigned to a logo detection when folding it into the brand
/// mention pool, by prominence.
pub fn logo_confidence(prominence: LogoProminence) -> f64 {
    match prominence {
        LogoProminence::Primary => 0.9,
        LogoProminence::Secondary => 0.7,
        LogoProminence::Background => 0.4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis_with(classification: Vec<CategoryScore>) -> MediaAnalysis {
        MediaAnalysis {
            provider_id: "job-1".to_string(),
            transcript: vec![],
            logo_detections: vec![],
            content_classification: classification,
        }
    }

    #[test]
    fn test_provider_evidence_passes_through() {
        let item = Evidence {
            category: ContentCategory::Violence,
            severity: Severity::High,
            start_seconds: Some(12.5),
            end_seconds: Some(14.0),
            quote: "fight scene".to_string(),
            modality: Modality::Visual,
        };
        let analysis = analysis_with(vec![CategoryScore {
            category: ContentCategory::Violence,
            score: 85,
            evidence: vec![item.clone()],
        }]);
        assert_eq!(analysis_to_evidence(&analysis), vec![item]);
    }

    #[test]
    fn test_high_score_without_evidence_synthesizes_one() {
        let analysis = analysis_with(vec![CategoryScore {
            category: ContentCategory::Substances,
            score: 91,
            evidence: vec![],
        }]);
        let evidence = analysis_to_evidence(&analysis);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].severity, Severity::High);
        assert!(evidence[0].quote.contains("91/100"));
    }

    #[test]
    fn test_low_score_without_evidence_is_silent() {
        let analysis = analysis_with(vec![CategoryScore {
            category: ContentCategory::Political,
            score: 12,
            evidence: vec![],
        }]);
        assert!(analysis_to_evidence(&analysis).is_empty());
    }

    #[test]
    fn test_logo_confidence_ordering() {
        assert!(logo_confidence(LogoProminence::Primary) > logo_confidence(LogoProminence::Secondary));
        assert!(
            logo_confidence(LogoProminence::Secondary) > logo_confidence(LogoProminence::Background)
        );
    }
}
