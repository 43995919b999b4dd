// Risk aggregation — pure functions from evidence/findings to the
// creator-level verdict.
//
// Deterministic given the same inputs, no I/O: testable without any
// network calls or database.

use crate::analysis::{ContentCategory, Evidence};
use crate::db::models::{Finding, FindingType, RiskLevel, Severity};

/// The aggregated verdict for one creator.
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub risk_level: RiskLevel,
    pub findings: Vec<Finding>,
    pub summary: String,
}

/// Fold one evidence item into a reportable finding.
///
/// High-severity evidence in the categories that sink brand deals outright
/// (violence, adult, dangerous) escalates to critical.
pub fn evidence_to_finding(evidence: &Evidence) -> Finding {
    let severity = if evidence.severity == Severity::High
        && matches!(
            evidence.category,
            ContentCategory::Violence | ContentCategory::Adult | ContentCategory::Dangerous
        ) {
        Severity::Critical
    } else {
        evidence.severity
    };

    Finding {
        finding_type: FindingType::Other,
        severity,
        title: format!("{} content detected", evidence.category),
        summary: evidence.quote.clone(),
        source: format!("content analysis ({:?})", evidence.modality).to_lowercase(),
    }
}

/// Deduplicate findings by (type, title, source), keeping the highest
/// severity seen for each, then sort most-severe first.
pub fn dedup_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut merged: Vec<Finding> = Vec::new();
    for finding in findings {
        match merged.iter_mut().find(|f| {
            f.finding_type == finding.finding_type
                && f.title == finding.title
                && f.source == finding.source
        }) {
            Some(existing) => {
                if finding.severity > existing.severity {
                    existing.severity = finding.severity;
                    existing.summary = finding.summary;
                }
            }
            None => merged.push(finding),
        }
    }
    merged.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.title.cmp(&b.title))
    });
    merged
}

/// The overall risk level: highest severity present, LOW when analysis
/// completed with nothing found, UNKNOWN when no analysis completed at all.
pub fn overall_risk(findings: &[Finding], analysis_completed: bool) -> RiskLevel {
    match findings.iter().map(|f| f.severity).max() {
        Some(max) => max.to_risk_level(),
        None if analysis_completed => RiskLevel::Low,
        None => RiskLevel::Unknown,
    }
}

/// Human-readable one-paragraph rationale for the verdict.
pub fn build_summary(
    creator_name: &str,
    risk: RiskLevel,
    findings: &[Finding],
    posts_analyzed: usize,
) -> String {
    match risk {
        RiskLevel::Unknown => format!(
            "No analysis completed for {creator_name}; risk is unknown."
        ),
        RiskLevel::Low if findings.is_empty() => format!(
            "{creator_name}: {posts_analyzed} posts analyzed, no notable findings. Low risk."
        ),
        _ => {
            let top = &findings[0];
            format!(
                "{creator_name}: {} finding(s) across {posts_analyzed} posts; most severe: {} ({}). Overall risk {risk}.",
                findings.len(),
                top.title,
                top.severity,
            )
        }
    }
}

/// Aggregate everything produced for a creator into the final verdict.
pub fn aggregate(
    creator_name: &str,
    evidence: &[Evidence],
    extra_findings: Vec<Finding>,
    analysis_completed: bool,
    posts_analyzed: usize,
) -> Aggregated {
    let mut findings: Vec<Finding> = evidence.iter().map(evidence_to_finding).collect();
    findings.extend(extra_findings);
    let findings = dedup_findings(findings);
    let risk_level = overall_risk(&findings, analysis_completed);
    let summary = build_summary(creator_name, risk_level, &findings, posts_analyzed);
    Aggregated {
        risk_level,
        findings,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Modality;

    fn evidence(category: ContentCategory, severity: Severity) -> Evidence {
        Evidence {
            category,
            severity,
            start_seconds: None,
            end_seconds: None,
            quote: "q".to_string(),
            modality: Modality::Text,
        }
    }

    fn finding(severity: Severity, title: &str) -> Finding {
        Finding {
            finding_type: FindingType::NewsArticle,
            severity,
            title: title.to_string(),
            summary: "s".to_string(),
            source: "https://example.com".to_string(),
        }
    }

    #[test]
    fn test_no_analysis_is_unknown() {
        let result = aggregate("A", &[], vec![], false, 0);
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert!(result.summary.contains("unknown"));
    }

    #[test]
    fn test_clean_analysis_is_low() {
        let result = aggregate("A", &[], vec![], true, 12);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_risk_is_max_severity() {
        let result = aggregate(
            "A",
            &[evidence(ContentCategory::Substances, Severity::Medium)],
            vec![finding(Severity::Low, "old story")],
            true,
            5,
        );
        assert_eq!(result.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_high_violence_evidence_is_critical() {
        let result = aggregate(
            "A",
            &[evidence(ContentCategory::Violence, Severity::High)],
            vec![],
            true,
            5,
        );
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_high_profanity_stays_high() {
        // Escalation applies only to the critical-equivalent categories
        let result = aggregate(
            "A",
            &[evidence(ContentCategory::Profanity, Severity::High)],
            vec![],
            true,
            5,
        );
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_dedup_keeps_highest_severity() {
        let deduped = dedup_findings(vec![
            finding(Severity::Low, "same"),
            finding(Severity::High, "same"),
            finding(Severity::Medium, "different"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "same");
        assert_eq!(deduped[0].severity, Severity::High);
    }

    #[test]
    fn test_findings_sorted_most_severe_first() {
        let result = aggregate(
            "A",
            &[],
            vec![
                finding(Severity::Low, "a"),
                finding(Severity::Critical, "b"),
                finding(Severity::Medium, "c"),
            ],
            true,
            3,
        );
        let severities: Vec<Severity> = result.findings.iter().map(|f| f.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::Medium, Severity::Low]
        );
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let ev = [evidence(ContentCategory::Adult, Severity::Medium)];
        let extra = vec![finding(Severity::Medium, "x")];
        let a = aggregate("A", &ev, extra.clone(), true, 2);
        let b = aggregate("A", &ev, extra, true, 2);
        assert_eq!(a.risk_level, b.risk_level);
        assert_eq!(a.findings, b.findings);
        assert_eq!(a.summary, b.summary);
    }
}
