// Tier 2 — brand/ad detection.
//
// One text-model call per content item: is this sponsored or an ad, and
// which brands does it mention? The model is asked for strict JSON and the
// reply is parsed defensively — a malformed reply degrades to an empty
// detection rather than failing the creator.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PipelineError;

/// A single brand mentioned in a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandMention {
    pub name: String,
    /// Model confidence in the mention, 0.0 to 1.0.
    pub confidence: f64,
    /// Whether the mention looks like paid sponsorship.
    pub sponsored: bool,
}

/// The result of brand/ad detection on one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandDetection {
    /// Whether the item as a whole reads as sponsored content / an ad.
    pub is_ad: bool,
    pub brands: Vec<BrandMention>,
}

/// Trait for brand/ad detection. Implementations are async because the
/// default provider is a hosted text model.
#[async_trait]
pub trait BrandDetector: Send + Sync {
    /// Whether this detector can actually run. A disabled detector is
    /// skipped by the pipeline rather than called.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Detect sponsorship and brand mentions in one piece of text.
    async fn detect(&self, text: &str) -> Result<BrandDetection>;
}

/// Used when brand-detection credentials are absent — the tier is disabled
/// gracefully instead of failing the pipeline.
pub struct DisabledBrandDetector;

#[async_trait]
impl BrandDetector for DisabledBrandDetector {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn detect(&self, _text: &str) -> Result<BrandDetection> {
        Err(PipelineError::Config("brand detection is not configured".into()).into())
    }
}

/// Hosted text-model brand detector.
pub struct LlmBrandDetector {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmBrandDetector {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl BrandDetector for LlmBrandDetector {
    async fn detect(&self, text: &str) -> Result<BrandDetection> {
        let url = format!("{}/v1/completions", self.base_url);

        let prompt = format!(
            "Analyze this social media caption for sponsorship.\n\
             Reply with only JSON: {{\"isAd\": bool, \"brands\": \
             [{{\"name\": string, \"confidence\": number, \"sponsored\": bool}}]}}\n\n\
             Caption: {text}"
        );

        let request = CompletionRequest {
            model: self.model.clone(),
            prompt,
            max_tokens: 400,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call brand detection model")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Brand detection model returned {status}: {body}");
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse brand detection response")?;

        let detection = parse_detection(&completion.text).unwrap_or_else(|e| {
            // A chatty model reply degrades to "nothing detected" — tier 2
            // informs findings but never blocks the rest of the pipeline.
            warn!(error = %e, "Unparseable brand detection reply, using empty detection");
            BrandDetection::default()
        });

        debug!(
            is_ad = detection.is_ad,
            brands = detection.brands.len(),
            text_preview = &text[..text.len().min(50)],
            "Brand detection complete"
        );

        Ok(detection)
    }
}

/// Parse the model's JSON reply, tolerating surrounding prose by slicing
/// from the first '{' to the last '}'.
fn parse_detection(reply: &str) -> Result<BrandDetection> {
    let start = reply.find('{').context("No JSON object in reply")?;
    let end = reply.rfind('}').context("No JSON object in reply")?;
    let raw: RawDetection =
        serde_json::from_str(&reply[start..=end]).context("Malformed detection JSON")?;
    Ok(BrandDetection {
        is_ad: raw.is_ad,
        brands: raw
            .brands
            .into_iter()
            .map(|b| BrandMention {
                name: b.name,
                confidence: b.confidence.clamp(0.0, 1.0),
                sponsored: b.sponsored,
            })
            .collect(),
    })
}

// --- Model request/response types ---

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetection {
    #[serde(default)]
    is_ad: bool,
    #[serde(default)]
    brands: Vec<RawBrand>,
}

#[derive(Deserialize)]
struct RawBrand {
    name: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    sponsored: bool,
}
