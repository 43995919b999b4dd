// Multi-tier content analysis.
//
// Four tiers, each strictly more expensive than the last:
//   1. keyword screening (no network)
//   2. brand/ad detection (one text-model call per item)
//   3. thumbnail pre-screening (one cheap vision call per visual asset)
//   4. full media analysis (expensive, gated in by tier 3)
//
// Tier failures resolve toward more scrutiny, never less, and never abort
// the creator's processing on their own.

pub mod brands;
pub mod keywords;
pub mod media;
pub mod prescreen;
pub mod rate_limit;

use serde::{Deserialize, Serialize};

use crate::db::models::Severity;

/// Content category an evidence item falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Profanity,
    Violence,
    Adult,
    Substances,
    Controversial,
    Dangerous,
    Political,
    Competitor,
    Sponsor,
}

impl ContentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Profanity => "profanity",
            ContentCategory::Violence => "violence",
            ContentCategory::Adult => "adult",
            ContentCategory::Substances => "substances",
            ContentCategory::Controversial => "controversial",
            ContentCategory::Dangerous => "dangerous",
            ContentCategory::Political => "political",
            ContentCategory::Competitor => "competitor",
            ContentCategory::Sponsor => "sponsor",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an evidence item was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Audio,
    Visual,
    Text,
    Transcript,
}

/// A timestamped, categorized, severity-tagged raw signal produced by
/// content analysis. Produced only by the keyword screener and the full
/// media analyzer; feeds findings during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub category: ContentCategory,
    pub severity: Severity,
    /// Offset within the source asset, when known.
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
    /// Quoted text or a short description of what was observed.
    pub quote: String,
    pub modality: Modality,
}
