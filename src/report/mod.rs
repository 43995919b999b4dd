// Report building — aggregation of evidence and findings into the
// creator-level verdict, plus the merge helpers that keep reports additive.

pub mod aggregator;

use serde_json::Value;

use crate::db::models::{Report, RiskLevel};

/// Add or replace one provider key in a report's raw results.
///
/// Merges are strictly additive: existing keys other than `key` are never
/// touched, and writing the same key with the same value is a no-op, which
/// is what makes recovery idempotent.
pub fn merge_raw_result(report: &mut Report, key: &str, value: Value) {
    report.raw_results.insert(key.to_string(), value);
}

/// Raise a report's risk level, never lowering it.
pub fn merge_risk_level(report: &mut Report, incoming: RiskLevel) {
    report.risk_level = report.risk_level.max(incoming);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_report() -> Report {
        Report {
            id: "r1".to_string(),
            creator_id: "c1".to_string(),
            risk_level: RiskLevel::High,
            summary: String::new(),
            findings: vec![],
            search_queries: vec![],
            raw_results: serde_json::Map::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_merge_never_lowers_risk() {
        let mut report = blank_report();
        merge_risk_level(&mut report, RiskLevel::Low);
        assert_eq!(report.risk_level, RiskLevel::High);
        merge_risk_level(&mut report, RiskLevel::Critical);
        assert_eq!(report.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_merge_raw_result_preserves_other_keys() {
        let mut report = blank_report();
        merge_raw_result(&mut report, "keywordScreen", serde_json::json!({"matched": 2}));
        merge_raw_result(&mut report, "recoveredVideoAnalysis", serde_json::json!({"id": "j1"}));
        assert_eq!(report.raw_results.len(), 2);
        assert!(report.raw_results.contains_key("keywordScreen"));
    }

    #[test]
    fn test_merge_same_key_same_value_is_noop() {
        let mut report = blank_report();
        merge_raw_result(&mut report, "k", serde_json::json!({"a": 1}));
        let before = serde_json::to_string(&report.raw_results).unwrap();
        merge_raw_result(&mut report, "k", serde_json::json!({"a": 1}));
        let after = serde_json::to_string(&report.raw_results).unwrap();
        assert_eq!(before, after);
    }
}
