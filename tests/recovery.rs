// Recovery reconciliation tests — relinking is idempotent, additive, and
// never lowers an existing verdict.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use greenlight::analysis::media::{
    CategoryScore, CompletedAnalysis, MediaAnalysis, MediaAnalyzer,
};
use greenlight::analysis::{ContentCategory, Evidence, Modality};
use greenlight::db::models::{
    Batch, BatchStatus, Creator, CreatorStatus, Report, RiskLevel, Severity,
};
use greenlight::db::Database;
use greenlight::recovery::{self, RECOVERY_KEY};

/// Provider with two completed analyses: V1 is violent, V2 is mild.
struct FixtureProvider;

#[async_trait]
impl MediaAnalyzer for FixtureProvider {
    async fn submit(&self, _asset_url: &str) -> Result<String> {
        anyhow::bail!("not used in recovery")
    }

    async fn fetch_result(&self, provider_id: &str) -> Result<MediaAnalysis> {
        match provider_id {
            "V1" => Ok(MediaAnalysis {
                provider_id: "V1".to_string(),
                transcript: vec![],
                logo_detections: vec![],
                content_classification: vec![CategoryScore {
                    category: ContentCategory::Violence,
                    score: 88,
                    evidence: vec![Evidence {
                        category: ContentCategory::Violence,
                        severity: Severity::High,
                        start_seconds: Some(10.0),
                        end_seconds: Some(15.0),
                        quote: "street brawl".to_string(),
                        modality: Modality::Visual,
                    }],
                }],
            }),
            "V2" => Ok(MediaAnalysis {
                provider_id: "V2".to_string(),
                transcript: vec![],
                logo_detections: vec![],
                content_classification: vec![CategoryScore {
                    category: ContentCategory::Political,
                    score: 30,
                    evidence: vec![Evidence {
                        category: ContentCategory::Political,
                        severity: Severity::Low,
                        start_seconds: None,
                        end_seconds: None,
                        quote: "campaign sign in background".to_string(),
                        modality: Modality::Visual,
                    }],
                }],
            }),
            other => anyhow::bail!("unknown analysis {other}"),
        }
    }

    async fn list_completed(&self) -> Result<Vec<CompletedAnalysis>> {
        Ok(vec![
            CompletedAnalysis {
                provider_id: "V1".to_string(),
                asset_url: Some("https://cdn.example/v1.mp4".to_string()),
                completed_at: None,
            },
            CompletedAnalysis {
                provider_id: "V2".to_string(),
                asset_url: None,
                completed_at: None,
            },
        ])
    }
}

async fn seed_stuck_creator(db: &Arc<dyn Database>) -> String {
    db.create_batch(&Batch {
        id: "b1".to_string(),
        name: "Stalled batch".to_string(),
        status: BatchStatus::Processing,
        search_terms: None,
        owner: None,
        created_at: String::new(),
        completed_at: None,
    })
    .await
    .unwrap();

    let creator_id = "c1".to_string();
    db.insert_creator(&Creator {
        id: creator_id.clone(),
        batch_id: "b1".to_string(),
        name: "Stuck Creator".to_string(),
        social_links: vec![],
        platform_status: Default::default(),
        status: CreatorStatus::Pending,
        error: None,
        created_at: String::new(),
        updated_at: String::new(),
    })
    .await
    .unwrap();
    db.advance_creator_status(&creator_id, CreatorStatus::Processing, None)
        .await
        .unwrap();
    creator_id
}

// ============================================================
// Relink — creates the report, unsticks the creator, idempotent
// ============================================================

#[tokio::test]
async fn relink_unsticks_creator_and_creates_report() {
    let db = greenlight::db::open_in_memory().unwrap();
    let creator_id = seed_stuck_creator(&db).await;
    let analyzer: Arc<dyn MediaAnalyzer> = Arc::new(FixtureProvider);

    let outcome = recovery::relink(&db, &analyzer, "V1", &creator_id)
        .await
        .unwrap();
    assert!(outcome.report_created);
    assert!(outcome.creator_unstuck);
    // High violence evidence escalates to a critical-equivalent verdict
    assert_eq!(outcome.risk_level, RiskLevel::Critical);

    let creator = db.get_creator(&creator_id).await.unwrap().unwrap();
    assert_eq!(creator.status, CreatorStatus::Completed);

    let report = db.get_report_for_creator(&creator_id).await.unwrap().unwrap();
    assert!(report.raw_results.contains_key(RECOVERY_KEY));
    assert!(!report.findings.is_empty());
}

#[tokio::test]
async fn relinking_twice_is_byte_identical() {
    let db = greenlight::db::open_in_memory().unwrap();
    let creator_id = seed_stuck_creator(&db).await;
    let analyzer: Arc<dyn MediaAnalyzer> = Arc::new(FixtureProvider);

    recovery::relink(&db, &analyzer, "V1", &creator_id)
        .await
        .unwrap();
    let first = db.get_report_for_creator(&creator_id).await.unwrap().unwrap();
    let first_raw = serde_json::to_string(&first.raw_results).unwrap();

    let outcome = recovery::relink(&db, &analyzer, "V1", &creator_id)
        .await
        .unwrap();
    // Second pass neither re-creates nor re-unsticks
    assert!(!outcome.report_created);
    assert!(!outcome.creator_unstuck);

    let second = db.get_report_for_creator(&creator_id).await.unwrap().unwrap();
    let second_raw = serde_json::to_string(&second.raw_results).unwrap();
    assert_eq!(first_raw, second_raw);
    assert_eq!(first.findings, second.findings);
    assert_eq!(first.risk_level, second.risk_level);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.id, second.id);
}

// ============================================================
// Merge — additive, never lowers
// ============================================================

#[tokio::test]
async fn relink_preserves_existing_report_data() {
    let db = greenlight::db::open_in_memory().unwrap();
    let creator_id = seed_stuck_creator(&db).await;
    let analyzer: Arc<dyn MediaAnalyzer> = Arc::new(FixtureProvider);

    // A report already exists with a HIGH verdict and live-pipeline keys
    let mut raw = serde_json::Map::new();
    raw.insert(
        "keywordScreen".to_string(),
        serde_json::json!({ "flaggedTerms": ["matched term \"scandal\""] }),
    );
    db.save_report(&Report {
        id: "r-existing".to_string(),
        creator_id: creator_id.clone(),
        risk_level: RiskLevel::High,
        summary: "Existing summary".to_string(),
        findings: vec![],
        search_queries: vec!["Stuck Creator".to_string()],
        raw_results: raw,
        created_at: String::new(),
        updated_at: String::new(),
    })
    .await
    .unwrap();

    // Recover the MILD analysis (V2): merge must not lower HIGH
    let outcome = recovery::relink(&db, &analyzer, "V2", &creator_id)
        .await
        .unwrap();
    assert!(!outcome.report_created);
    assert_eq!(outcome.risk_level, RiskLevel::High);

    let report = db.get_report_for_creator(&creator_id).await.unwrap().unwrap();
    assert_eq!(report.id, "r-existing");
    assert_eq!(report.risk_level, RiskLevel::High);
    // Existing keys and fields untouched; recovery key added alongside
    assert!(report.raw_results.contains_key("keywordScreen"));
    assert!(report.raw_results.contains_key(RECOVERY_KEY));
    assert_eq!(report.summary, "Existing summary");
    assert_eq!(report.search_queries, vec!["Stuck Creator".to_string()]);
}

// ============================================================
// Discovery — unlinked analyses and stale creators
// ============================================================

#[tokio::test]
async fn unlinked_listing_excludes_already_linked() {
    let db = greenlight::db::open_in_memory().unwrap();
    let creator_id = seed_stuck_creator(&db).await;
    let analyzer: Arc<dyn MediaAnalyzer> = Arc::new(FixtureProvider);

    // Nothing linked yet: both show up
    let unlinked = recovery::find_unlinked_analyses(&db, &analyzer)
        .await
        .unwrap();
    let ids: Vec<&str> = unlinked.iter().map(|a| a.provider_id.as_str()).collect();
    assert_eq!(ids, vec!["V1", "V2"]);

    // Link V1; only V2 remains
    recovery::relink(&db, &analyzer, "V1", &creator_id)
        .await
        .unwrap();
    let unlinked = recovery::find_unlinked_analyses(&db, &analyzer)
        .await
        .unwrap();
    let ids: Vec<&str> = unlinked.iter().map(|a| a.provider_id.as_str()).collect();
    assert_eq!(ids, vec!["V2"]);
}

#[tokio::test]
async fn stale_creators_listing_finds_stuck_rows() {
    let db = greenlight::db::open_in_memory().unwrap();
    let creator_id = seed_stuck_creator(&db).await;

    // updated_at is "now" — nothing is stale yet at a 30-minute cutoff
    let stale = recovery::find_stale_creators(&db, 30).await.unwrap();
    assert!(stale.is_empty());

    // At a zero-minute cutoff the processing row shows up
    let stale = recovery::find_stale_creators(&db, 0).await.unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].id, creator_id);
    assert_eq!(stale[0].status, CreatorStatus::Processing);
}
