// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite directly.

use serde::{Deserialize, Serialize};

/// Lifecycle of a batch of creators submitted together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "PENDING",
            BatchStatus::Processing => "PROCESSING",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PROCESSING" => BatchStatus::Processing,
            "COMPLETED" => BatchStatus::Completed,
            "FAILED" => BatchStatus::Failed,
            _ => BatchStatus::Pending,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named group of creators vetted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub name: String,
    pub status: BatchStatus,
    pub search_terms: Option<String>,
    pub owner: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Lifecycle of a single creator within a batch.
///
/// Status only ever advances: PENDING → PROCESSING → {COMPLETED, FAILED}.
/// Recovery may jump a stuck PENDING/PROCESSING creator straight to
/// COMPLETED; nothing moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreatorStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CreatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatorStatus::Pending => "PENDING",
            CreatorStatus::Processing => "PROCESSING",
            CreatorStatus::Completed => "COMPLETED",
            CreatorStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PROCESSING" => CreatorStatus::Processing,
            "COMPLETED" => CreatorStatus::Completed,
            "FAILED" => CreatorStatus::Failed,
            _ => CreatorStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CreatorStatus::Completed | CreatorStatus::Failed)
    }

    /// Whether a transition from `self` to `next` is a legal forward move.
    pub fn can_advance_to(&self, next: CreatorStatus) -> bool {
        match self {
            CreatorStatus::Pending => next != CreatorStatus::Pending,
            CreatorStatus::Processing => next.is_terminal(),
            CreatorStatus::Completed | CreatorStatus::Failed => false,
        }
    }
}

impl std::fmt::Display for CreatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A person/account being vetted, identified by one or more social links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub batch_id: String,
    pub name: String,
    pub social_links: Vec<String>,
    /// Per-platform fetch outcome ("NOT_REQUESTED" / "PENDING" /
    /// "COMPLETED" / "FAILED"), keyed by platform name.
    pub platform_status: std::collections::BTreeMap<String, String>,
    pub status: CreatorStatus,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The ordered creator-level verdict. Merges never lower it — combining two
/// levels always keeps the more severe one, which the derived `Ord` gives us
/// for free (variants are declared least → most severe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "UNKNOWN",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "LOW" => RiskLevel::Low,
            "MEDIUM" => RiskLevel::Medium,
            "HIGH" => RiskLevel::High,
            "CRITICAL" => RiskLevel::Critical,
            _ => RiskLevel::Unknown,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a single finding or evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Map a finding severity to the creator-level risk it implies.
    pub fn to_risk_level(&self) -> RiskLevel {
        match self {
            Severity::Low => RiskLevel::Low,
            Severity::Medium => RiskLevel::Medium,
            Severity::High => RiskLevel::High,
            Severity::Critical => RiskLevel::Critical,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of reportable risk item a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    CourtCase,
    NewsArticle,
    SocialControversy,
    Other,
}

impl FindingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingType::CourtCase => "court_case",
            FindingType::NewsArticle => "news_article",
            FindingType::SocialControversy => "social_controversy",
            FindingType::Other => "other",
        }
    }
}

/// An aggregated, reportable risk item surfaced on the creator's report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub severity: Severity,
    pub title: String,
    pub summary: String,
    pub source: String,
}

/// The per-creator vetting report. Created once on first successful analysis
/// (or by recovery); subsequently merged into, never replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub creator_id: String,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub findings: Vec<Finding>,
    pub search_queries: Vec<String>,
    /// Opaque raw-results payload keyed by analysis provider. Extensible
    /// without schema migration; merges are strictly additive.
    pub raw_results: serde_json::Map<String, serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// A pre-transcribed post from the content cache, indexed by handle and
/// platform. Consulted before any live fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPost {
    pub id: String,
    pub handle: String,
    pub platform: String,
    pub caption: Option<String>,
    pub transcript: Option<String>,
    pub media_url: Option<String>,
    pub media_kind: Option<String>,
    pub posted_at: String,
    pub cached_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_status_never_moves_backward() {
        assert!(CreatorStatus::Pending.can_advance_to(CreatorStatus::Processing));
        assert!(CreatorStatus::Pending.can_advance_to(CreatorStatus::Completed));
        assert!(CreatorStatus::Processing.can_advance_to(CreatorStatus::Completed));
        assert!(CreatorStatus::Processing.can_advance_to(CreatorStatus::Failed));
        assert!(!CreatorStatus::Processing.can_advance_to(CreatorStatus::Pending));
        assert!(!CreatorStatus::Completed.can_advance_to(CreatorStatus::Processing));
        assert!(!CreatorStatus::Completed.can_advance_to(CreatorStatus::Failed));
        assert!(!CreatorStatus::Failed.can_advance_to(CreatorStatus::Completed));
    }

    #[test]
    fn risk_level_ordering_is_monotonic() {
        assert!(RiskLevel::Unknown < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        // Merge rule: max() never lowers an existing level
        assert_eq!(RiskLevel::High.max(RiskLevel::Low), RiskLevel::High);
    }

    #[test]
    fn status_round_trip() {
        for s in [
            CreatorStatus::Pending,
            CreatorStatus::Processing,
            CreatorStatus::Completed,
            CreatorStatus::Failed,
        ] {
            assert_eq!(CreatorStatus::parse(s.as_str()), s);
        }
        for r in [
            RiskLevel::Unknown,
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            assert_eq!(RiskLevel::parse(r.as_str()), r);
        }
    }

    #[test]
    fn severity_maps_to_matching_risk_level() {
        assert_eq!(Severity::Critical.to_risk_level(), RiskLevel::Critical);
        assert_eq!(Severity::Low.to_risk_level(), RiskLevel::Low);
    }
}
