// Per-creator driver — fetch content, run the analysis tiers, aggregate,
// persist the report, and emit exactly one terminal event.
//
// Every failure mode inside the tiers resolves toward more scrutiny and
// keeps the creator alive, with one exception: the full media analyzer
// failing for an asset that was gated in marks the creator FAILED. Either
// way the outcome is terminal and sibling creators never notice.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::PipelineCtx;
use crate::analysis::brands::{BrandDetection, BrandMention};
use crate::analysis::media::{self, MediaAnalysis};
use crate::analysis::prescreen::PreScreenResult;
use crate::analysis::{ContentCategory, Evidence, Modality};
use crate::content::{self, ContentItem, MediaRef, PlatformFetch};
use crate::db::models::{Creator, CreatorStatus, Finding, Report, RiskLevel};
use crate::error::PipelineError;
use crate::events::{AnalysisStep, StepStatus, StreamEvent};
use crate::platforms::resolve_link;
use crate::report::aggregator;
use crate::search;

/// Terminal outcome of one creator's run.
#[derive(Debug, Clone)]
pub struct CreatorOutcome {
    pub creator_id: String,
    pub name: String,
    pub posts_analyzed: u32,
    /// Ok(risk level) or Err(short failure message).
    pub result: std::result::Result<RiskLevel, String>,
}

/// Process one creator to a terminal state. Never propagates an error —
/// the bulkhead between creators is this function's signature.
pub async fn process_creator(ctx: &PipelineCtx, creator: &Creator) -> CreatorOutcome {
    ctx.bus.publish(StreamEvent::CreatorStarted {
        creator_id: creator.id.clone(),
        name: creator.name.clone(),
        timestamp: Utc::now(),
    });

    if let Err(e) = ctx
        .db
        .advance_creator_status(&creator.id, CreatorStatus::Processing, None)
        .await
    {
        warn!(error = %e, creator = creator.name, "Failed to mark creator processing");
    }

    match run_analysis(ctx, creator).await {
        Ok(analyzed) => {
            if let Err(e) = ctx
                .db
                .advance_creator_status(&creator.id, CreatorStatus::Completed, None)
                .await
            {
                warn!(error = %e, creator = creator.name, "Failed to mark creator completed");
            }
            ctx.bus.publish(StreamEvent::CreatorCompleted {
                creator_id: creator.id.clone(),
                name: creator.name.clone(),
                risk_level: analyzed.risk_level,
                findings_count: analyzed.findings_count,
                summary: analyzed.summary.clone(),
                timestamp: Utc::now(),
            });
            info!(
                creator = creator.name,
                risk = %analyzed.risk_level,
                findings = analyzed.findings_count,
                posts = analyzed.posts_analyzed,
                "Creator vetted"
            );
            CreatorOutcome {
                creator_id: creator.id.clone(),
                name: creator.name.clone(),
                posts_analyzed: analyzed.posts_analyzed,
                result: Ok(analyzed.risk_level),
            }
        }
        Err(e) => {
            let message = format!("{e:#}");
            if let Err(db_err) = ctx
                .db
                .advance_creator_status(&creator.id, CreatorStatus::Failed, Some(&message))
                .await
            {
                warn!(error = %db_err, creator = creator.name, "Failed to mark creator failed");
            }
            ctx.bus.publish(StreamEvent::CreatorFailed {
                creator_id: creator.id.clone(),
                name: creator.name.clone(),
                error: message.clone(),
                timestamp: Utc::now(),
            });
            warn!(creator = creator.name, error = message, "Creator failed");
            CreatorOutcome {
                creator_id: creator.id.clone(),
                name: creator.name.clone(),
                posts_analyzed: 0,
                result: Err(message),
            }
        }
    }
}

struct AnalyzedCreator {
    risk_level: RiskLevel,
    findings_count: u32,
    summary: String,
    posts_analyzed: u32,
}

async fn run_analysis(ctx: &PipelineCtx, creator: &Creator) -> Result<AnalyzedCreator> {
    // --- Validation: resolve social links to (platform, handle) pairs ---
    step(ctx, &creator.id, AnalysisStep::Validation, StepStatus::Started);
    let mut targets = Vec::new();
    for link in &creator.social_links {
        match resolve_link(link) {
            Some(pair) => {
                if !targets.contains(&pair) {
                    targets.push(pair);
                }
            }
            None => warn!(creator = creator.name, link = link, "Unrecognized profile link"),
        }
    }
    step(ctx, &creator.id, AnalysisStep::Validation, StepStatus::Completed);

    // --- Background search (non-content signals) ---
    let mut search_queries = Vec::new();
    let mut search_findings = Vec::new();
    let mut search_completed = false;
    if ctx.search.is_enabled() {
        let search_id = Uuid::new_v4().to_string();
        let query = creator.name.clone();
        let source = ctx.search.source().to_string();
        ctx.bus.publish(StreamEvent::SearchStarted {
            creator_id: creator.id.clone(),
            search_id: search_id.clone(),
            query: query.clone(),
            source: source.clone(),
            timestamp: Utc::now(),
        });
        let started = Instant::now();
        let hits = match ctx.search.search(&query).await {
            Ok(hits) => {
                search_completed = true;
                hits
            }
            Err(e) => {
                warn!(error = %e, creator = creator.name, "Background search failed");
                Vec::new()
            }
        };
        ctx.bus.publish(StreamEvent::SearchCompleted {
            creator_id: creator.id.clone(),
            search_id,
            query: query.clone(),
            source,
            results_count: hits.len() as u32,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        search_queries.push(query);
        search_findings = search::hits_to_findings(&hits);
    }

    // --- Content fetch (cache first, per-platform isolation) ---
    let fetches: Vec<PlatformFetch> = content::fetch_creator_content(
        &ctx.db,
        &ctx.adapters,
        &ctx.pools.scrape,
        &ctx.bus,
        &creator.id,
        &targets,
        ctx.lookback_months,
    )
    .await;
    let items: Vec<ContentItem> = fetches.iter().flat_map(|f| f.items.clone()).collect();

    // --- Tier 1: keyword screening ---
    step(ctx, &creator.id, AnalysisStep::ProfanityCheck, StepStatus::Started);
    let mut evidence: Vec<Evidence> = Vec::new();
    let mut flagged_terms: Vec<String> = Vec::new();
    for item in &items {
        for ev in ctx.screener.screen_to_evidence(&item.caption, Modality::Text) {
            flagged_terms.push(ev.quote.clone());
            evidence.push(ev);
        }
        if let Some(transcript) = &item.transcript {
            for ev in ctx.screener.screen_to_evidence(transcript, Modality::Transcript) {
                flagged_terms.push(ev.quote.clone());
                evidence.push(ev);
            }
        }
    }
    let keyword_completed = !items.is_empty();
    step(ctx, &creator.id, AnalysisStep::ProfanityCheck, StepStatus::Completed);

    // --- Tier 2: brand/ad detection ---
    step(ctx, &creator.id, AnalysisStep::BrandDetection, StepStatus::Started);
    let (detections, brand_completed) = detect_brands(ctx, &items).await;
    step(ctx, &creator.id, AnalysisStep::BrandDetection, StepStatus::Completed);

    // --- Tiers 3 + 4: pre-screen gate, then full media analysis ---
    step(ctx, &creator.id, AnalysisStep::ContentAnalysis, StepStatus::Started);
    let media_outcome = analyze_media(ctx, creator, &items).await?;
    evidence.extend(
        media_outcome
            .analyses
            .iter()
            .flat_map(media::analysis_to_evidence),
    );
    let media_completed = media_outcome.prescreened > 0 || !media_outcome.analyses.is_empty();
    step(ctx, &creator.id, AnalysisStep::ContentAnalysis, StepStatus::Completed);

    // --- Competitor/sponsor analysis over everything brand-shaped ---
    step(ctx, &creator.id, AnalysisStep::CompetitorAnalysis, StepStatus::Started);
    let mentions = collect_brand_mentions(&detections, &media_outcome.analyses);
    evidence.extend(competitor_evidence(&mentions, &ctx.competitor_brands));
    step(ctx, &creator.id, AnalysisStep::CompetitorAnalysis, StepStatus::Completed);

    // --- Aggregate into the verdict ---
    step(ctx, &creator.id, AnalysisStep::RationaleGeneration, StepStatus::Started);
    let analysis_completed =
        keyword_completed || brand_completed || media_completed || search_completed;
    let aggregated = aggregator::aggregate(
        &creator.name,
        &evidence,
        search_findings,
        analysis_completed,
        items.len(),
    );
    step(ctx, &creator.id, AnalysisStep::RationaleGeneration, StepStatus::Completed);

    for finding in &aggregated.findings {
        ctx.bus.publish(StreamEvent::FindingDiscovered {
            creator_id: creator.id.clone(),
            title: finding.title.clone(),
            severity: finding.severity,
            finding_type: finding.finding_type,
            source: finding.source.clone(),
            timestamp: Utc::now(),
        });
    }

    persist_report(
        ctx,
        creator,
        &aggregated,
        search_queries,
        &flagged_terms,
        &detections,
        &media_outcome,
    )
    .await?;

    Ok(AnalyzedCreator {
        risk_level: aggregated.risk_level,
        findings_count: aggregated.findings.len() as u32,
        summary: aggregated.summary,
        posts_analyzed: items.len() as u32,
    })
}

fn step(ctx: &PipelineCtx, creator_id: &str, step: AnalysisStep, status: StepStatus) {
    ctx.bus.publish(StreamEvent::AnalysisStep {
        creator_id: creator_id.to_string(),
        step,
        status,
        timestamp: Utc::now(),
    });
}

/// Tier 2 over every text-bearing item, bounded by the brand pool. A failed
/// call degrades to no detection for that item.
async fn detect_brands(ctx: &PipelineCtx, items: &[ContentItem]) -> (Vec<BrandDetection>, bool) {
    if !ctx.brands.is_enabled() {
        return (Vec::new(), false);
    }
    let texts: Vec<String> = items
        .iter()
        .filter(|i| i.has_text())
        .map(|i| match &i.transcript {
            Some(t) => format!("{}\n{t}", i.caption),
            None => i.caption.clone(),
        })
        .collect();

    let results: Vec<Result<BrandDetection>> = stream::iter(texts.into_iter().map(|text| {
        let brands = Arc::clone(&ctx.brands);
        let pool = ctx.pools.brand.clone();
        async move {
            let _permit = pool.acquire().await?;
            brands.detect(&text).await
        }
    }))
    .buffer_unordered(ctx.limits.brand_concurrency.max(1))
    .collect()
    .await;

    let mut detections = Vec::new();
    let mut any_ok = false;
    for result in results {
        match result {
            Ok(d) => {
                any_ok = true;
                detections.push(d);
            }
            Err(e) => warn!(error = %e, "Brand detection call failed, skipping item"),
        }
    }
    (detections, any_ok)
}

struct MediaTierOutcome {
    prescreens: Vec<PreScreenResult>,
    analyses: Vec<MediaAnalysis>,
    /// Assets that went through tier 3.
    prescreened: usize,
    /// Assets gated in but skipped because the analyzer is unconfigured.
    skipped_unconfigured: usize,
}

/// Tiers 3 and 4 over every visual asset.
///
/// Pre-screen failures fail open (the asset is analyzed anyway); a full
/// analysis failure for a gated-in asset is the one error that propagates
/// and fails the creator.
async fn analyze_media(
    ctx: &PipelineCtx,
    creator: &Creator,
    items: &[ContentItem],
) -> Result<MediaTierOutcome> {
    let assets: Vec<MediaRef> = items.iter().filter_map(|i| i.media.clone()).collect();
    let media_enabled = ctx.media.is_enabled();
    let prescreen_enabled = ctx.prescreener.is_enabled();
    if !media_enabled && !assets.is_empty() {
        warn!(
            creator = creator.name,
            assets = assets.len(),
            "Media analysis unconfigured; gated assets will be skipped"
        );
    }

    let results: Vec<Result<(Option<PreScreenResult>, Option<MediaAnalysis>, bool)>> =
        stream::iter(assets.iter().map(|asset| {
            let media_ref = asset.clone();
            let prescreener = Arc::clone(&ctx.prescreener);
            let analyzer = Arc::clone(&ctx.media);
            let image_pool = ctx.pools.image.clone();
            let video_pool = ctx.pools.video.clone();
            async move {
                // Tier 3: one cheap vision call per visual asset. Only a
                // confident "safe" authorizes skipping tier 4; call failures
                // route toward full analysis, never away from it.
                let prescreen = if prescreen_enabled {
                    let _permit = image_pool.acquire().await?;
                    match prescreener.prescreen(&media_ref.url).await {
                        Ok(result) => Some(result),
                        Err(e) => {
                            warn!(error = %e, url = media_ref.url, "Pre-screen failed, gating in");
                            Some(PreScreenResult::needs_analysis_fallback())
                        }
                    }
                } else {
                    None
                };

                let needs_full = prescreen
                    .as_ref()
                    .map(|p| p.needs_full_analysis)
                    .unwrap_or(true);

                if !needs_full {
                    return Ok((prescreen, None, false));
                }
                if !media_enabled {
                    return Ok((prescreen, None, true));
                }

                // Tier 4: expensive full analysis. Images gate in the same
                // way videos do; they just come back without a transcript.
                let _permit = video_pool.acquire().await?;
                let job_id = analyzer.submit(&media_ref.url).await.map_err(|e| {
                    PipelineError::Analysis(format!("Full media analysis submit failed: {e:#}"))
                })?;
                let analysis = analyzer.fetch_result(&job_id).await.map_err(|e| {
                    PipelineError::Analysis(format!("Full media analysis failed: {e:#}"))
                })?;
                Ok((prescreen, Some(analysis), false))
            }
        }))
        .buffer_unordered(assets.len().max(1))
        .collect()
        .await;

    let mut outcome = MediaTierOutcome {
        prescreens: Vec::new(),
        analyses: Vec::new(),
        prescreened: 0,
        skipped_unconfigured: 0,
    };
    for result in results {
        let (prescreen, analysis, skipped) = result?;
        if let Some(p) = prescreen {
            outcome.prescreened += 1;
            outcome.prescreens.push(p);
        }
        if let Some(a) = analysis {
            outcome.analyses.push(a);
        }
        if skipped {
            outcome.skipped_unconfigured += 1;
        }
    }
    Ok(outcome)
}

/// Pool brand mentions from tier 2 with logo detections from tier 4.
fn collect_brand_mentions(
    detections: &[BrandDetection],
    analyses: &[MediaAnalysis],
) -> Vec<BrandMention> {
    let mut mentions: Vec<BrandMention> = Vec::new();
    for detection in detections {
        mentions.extend(detection.brands.iter().cloned());
    }
    for analysis in analyses {
        for logo in &analysis.logo_detections {
            mentions.push(BrandMention {
                name: logo.brand.clone(),
                confidence: media::logo_confidence(logo.prominence),
                sponsored: false,
            });
        }
    }
    mentions
}

/// Sponsored mentions and competitor matches become evidence.
fn competitor_evidence(mentions: &[BrandMention], competitors: &[String]) -> Vec<Evidence> {
    let mut evidence = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for mention in mentions {
        let lowered = mention.name.to_lowercase();
        if seen.contains(&lowered) {
            continue;
        }
        seen.push(lowered.clone());

        let is_competitor = competitors.iter().any(|c| c.to_lowercase() == lowered);
        if is_competitor {
            evidence.push(Evidence {
                category: ContentCategory::Competitor,
                severity: crate::db::models::Severity::Medium,
                start_seconds: None,
                end_seconds: None,
                quote: format!("competitor brand \"{}\" present", mention.name),
                modality: Modality::Visual,
            });
        } else if mention.sponsored {
            evidence.push(Evidence {
                category: ContentCategory::Sponsor,
                severity: crate::db::models::Severity::Low,
                start_seconds: None,
                end_seconds: None,
                quote: format!("sponsored mention of \"{}\"", mention.name),
                modality: Modality::Text,
            });
        }
    }
    evidence
}

async fn persist_report(
    ctx: &PipelineCtx,
    creator: &Creator,
    aggregated: &aggregator::Aggregated,
    search_queries: Vec<String>,
    flagged_terms: &[String],
    detections: &[BrandDetection],
    media_outcome: &MediaTierOutcome,
) -> Result<()> {
    let job_ids: Vec<&str> = media_outcome
        .analyses
        .iter()
        .map(|a| a.provider_id.as_str())
        .collect();

    let mut report = match ctx.db.get_report_for_creator(&creator.id).await? {
        Some(existing) => existing,
        None => Report {
            id: Uuid::new_v4().to_string(),
            creator_id: creator.id.clone(),
            risk_level: RiskLevel::Unknown,
            summary: String::new(),
            findings: Vec::new(),
            search_queries: Vec::new(),
            raw_results: serde_json::Map::new(),
            created_at: String::new(),
            updated_at: String::new(),
        },
    };

    // Merge, never replace: risk only rises, findings dedup-append, and
    // raw-result keys are added per provider.
    crate::report::merge_risk_level(&mut report, aggregated.risk_level);
    let mut findings: Vec<Finding> = report.findings.clone();
    findings.extend(aggregated.findings.iter().cloned());
    report.findings = aggregator::dedup_findings(findings);
    report.summary = aggregated.summary.clone();
    for query in search_queries {
        if !report.search_queries.contains(&query) {
            report.search_queries.push(query);
        }
    }
    crate::report::merge_raw_result(
        &mut report,
        "keywordScreen",
        serde_json::json!({ "flaggedTerms": flagged_terms }),
    );
    crate::report::merge_raw_result(
        &mut report,
        "brandDetection",
        serde_json::to_value(detections)?,
    );
    crate::report::merge_raw_result(
        &mut report,
        "preScreen",
        serde_json::to_value(&media_outcome.prescreens)?,
    );
    crate::report::merge_raw_result(
        &mut report,
        "mediaAnalysis",
        serde_json::json!({
            "jobs": job_ids,
            "skippedUnconfigured": media_outcome.skipped_unconfigured,
        }),
    );

    ctx.db.save_report(&report).await
}
