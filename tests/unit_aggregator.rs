// Unit tests for risk aggregation — the verdict rules, boundary by boundary.

use greenlight::analysis::{ContentCategory, Evidence, Modality};
use greenlight::db::models::{Finding, FindingType, RiskLevel, Severity};
use greenlight::report::aggregator::{aggregate, dedup_findings, overall_risk};

fn evidence(category: ContentCategory, severity: Severity) -> Evidence {
    Evidence {
        category,
        severity,
        start_seconds: Some(3.0),
        end_seconds: None,
        quote: "observed".to_string(),
        modality: Modality::Visual,
    }
}

fn finding(severity: Severity, title: &str, source: &str) -> Finding {
    Finding {
        finding_type: FindingType::NewsArticle,
        severity,
        title: title.to_string(),
        summary: "summary".to_string(),
        source: source.to_string(),
    }
}

// ============================================================
// Overall risk — the iff rules
// ============================================================

#[test]
fn critical_iff_critical_equivalent_present() {
    // Critical finding -> CRITICAL
    let findings = vec![finding(Severity::Critical, "a", "s")];
    assert_eq!(overall_risk(&findings, true), RiskLevel::Critical);

    // Nothing above high -> not CRITICAL
    let findings = vec![finding(Severity::High, "a", "s")];
    assert_eq!(overall_risk(&findings, true), RiskLevel::High);
}

#[test]
fn low_iff_analysis_ran_and_max_severity_low_or_empty() {
    let findings = vec![finding(Severity::Low, "a", "s")];
    assert_eq!(overall_risk(&findings, true), RiskLevel::Low);
    assert_eq!(overall_risk(&[], true), RiskLevel::Low);
}

#[test]
fn unknown_iff_no_analysis_completed() {
    assert_eq!(overall_risk(&[], false), RiskLevel::Unknown);
    // Once any analysis ran, the floor is LOW
    assert_ne!(overall_risk(&[], true), RiskLevel::Unknown);
}

#[test]
fn high_violence_evidence_escalates_to_critical() {
    let result = aggregate(
        "Creator",
        &[evidence(ContentCategory::Violence, Severity::High)],
        vec![],
        true,
        4,
    );
    assert_eq!(result.risk_level, RiskLevel::Critical);
}

#[test]
fn high_substances_evidence_stays_high() {
    let result = aggregate(
        "Creator",
        &[evidence(ContentCategory::Substances, Severity::High)],
        vec![],
        true,
        4,
    );
    assert_eq!(result.risk_level, RiskLevel::High);
}

// ============================================================
// Dedup and ordering
// ============================================================

#[test]
fn duplicate_findings_collapse_keeping_worst() {
    let deduped = dedup_findings(vec![
        finding(Severity::Medium, "same story", "https://a"),
        finding(Severity::High, "same story", "https://a"),
        finding(Severity::Medium, "same story", "https://b"), // different source survives
    ]);
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].severity, Severity::High);
}

#[test]
fn findings_sorted_most_severe_first_then_title() {
    let deduped = dedup_findings(vec![
        finding(Severity::Low, "zeta", "s1"),
        finding(Severity::Low, "alpha", "s2"),
        finding(Severity::Critical, "omega", "s3"),
    ]);
    assert_eq!(deduped[0].severity, Severity::Critical);
    assert_eq!(deduped[1].title, "alpha");
    assert_eq!(deduped[2].title, "zeta");
}

#[test]
fn dedup_is_idempotent() {
    let input = vec![
        finding(Severity::High, "a", "s"),
        finding(Severity::Low, "b", "s"),
    ];
    let once = dedup_findings(input.clone());
    let twice = dedup_findings(once.clone());
    assert_eq!(once, twice);
}

// ============================================================
// Summary text
// ============================================================

#[test]
fn summary_names_the_top_finding() {
    let result = aggregate(
        "Creator X",
        &[],
        vec![
            finding(Severity::Low, "minor mention", "s1"),
            finding(Severity::High, "major lawsuit", "s2"),
        ],
        true,
        9,
    );
    assert!(result.summary.contains("major lawsuit"));
    assert!(result.summary.contains("HIGH"));
}

#[test]
fn summary_for_clean_creator_mentions_low_risk() {
    let result = aggregate("Creator X", &[], vec![], true, 15);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert!(result.summary.contains("no notable findings"));
}

#[test]
fn summary_for_unanalyzed_creator_mentions_unknown() {
    let result = aggregate("Creator X", &[], vec![], false, 0);
    assert!(result.summary.to_lowercase().contains("unknown"));
}
