// Recovery reconciliation — relink externally-completed analyses whose
// local write was lost, and surface creators stuck mid-pipeline.
//
// Runs out-of-band against the same persisted state the live pipeline uses.
// The merge is idempotent: applying the same (analysis, creator) pair twice
// yields the same persisted state as applying it once.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::analysis::media::{self, CompletedAnalysis, MediaAnalyzer};
use crate::db::models::{CreatorStatus, Report, RiskLevel};
use crate::db::Database;
use crate::error::PipelineError;
use crate::report::aggregator;
use crate::report::{merge_raw_result, merge_risk_level};

/// The raw-results key recovery writes under. Dedicated so reconciled data
/// never collides with what the live pipeline recorded.
pub const RECOVERY_KEY: &str = "recoveredVideoAnalysis";

/// Externally-completed analyses with no local report referencing them.
pub async fn find_unlinked_analyses(
    db: &Arc<dyn Database>,
    analyzer: &Arc<dyn MediaAnalyzer>,
) -> Result<Vec<CompletedAnalysis>> {
    let completed = analyzer
        .list_completed()
        .await
        .map_err(|e| PipelineError::Recovery(format!("provider listing failed: {e:#}")))?;

    let mut unlinked = Vec::new();
    for analysis in completed {
        if db
            .find_report_linking_analysis(&analysis.provider_id)
            .await?
            .is_none()
        {
            unlinked.push(analysis);
        }
    }
    Ok(unlinked)
}

/// Creators stuck in PENDING/PROCESSING whose updated_at is stale.
pub async fn find_stale_creators(
    db: &Arc<dyn Database>,
    stale_minutes: i64,
) -> Result<Vec<crate::db::models::Creator>> {
    db.find_stale_creators(stale_minutes).await
}

/// What relinking changed.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub report_id: String,
    pub report_created: bool,
    pub creator_unstuck: bool,
    pub risk_level: RiskLevel,
}

/// Merge one externally-completed analysis into a creator's report.
///
/// Creates the report if absent; adds the recovery key without touching any
/// other raw-results key; never lowers the risk level; transitions a stuck
/// creator to COMPLETED. Safe to repeat.
pub async fn relink(
    db: &Arc<dyn Database>,
    analyzer: &Arc<dyn MediaAnalyzer>,
    provider_id: &str,
    creator_id: &str,
) -> Result<RecoveryOutcome> {
    let creator = db
        .get_creator(creator_id)
        .await?
        .with_context(|| format!("Creator {creator_id} not found"))?;

    let analysis = analyzer.fetch_result(provider_id).await.map_err(|e| {
        PipelineError::Recovery(format!("could not fetch analysis {provider_id}: {e:#}"))
    })?;

    // Reclassify the recovered content so the merged report carries a
    // verdict, not just raw data.
    let evidence = media::analysis_to_evidence(&analysis);
    let aggregated = aggregator::aggregate(&creator.name, &evidence, Vec::new(), true, 1);

    let (mut report, report_created) = match db.get_report_for_creator(creator_id).await? {
        Some(existing) => (existing, false),
        None => (
            Report {
                id: Uuid::new_v4().to_string(),
                creator_id: creator_id.to_string(),
                risk_level: RiskLevel::Unknown,
                summary: aggregated.summary.clone(),
                findings: Vec::new(),
                search_queries: Vec::new(),
                raw_results: serde_json::Map::new(),
                created_at: String::new(),
                updated_at: String::new(),
            },
            true,
        ),
    };

    merge_risk_level(&mut report, aggregated.risk_level);
    let mut findings = report.findings.clone();
    findings.extend(aggregated.findings);
    report.findings = aggregator::dedup_findings(findings);
    merge_raw_result(&mut report, RECOVERY_KEY, serde_json::to_value(&analysis)?);

    db.save_report(&report).await?;

    let creator_unstuck = db
        .advance_creator_status(creator_id, CreatorStatus::Completed, None)
        .await?;

    info!(
        creator = creator.name,
        provider_id,
        report_created,
        creator_unstuck,
        risk = %report.risk_level,
        "Relinked external analysis"
    );

    Ok(RecoveryOutcome {
        report_id: report.id.clone(),
        report_created,
        creator_unstuck,
        risk_level: report.risk_level,
    })
}
