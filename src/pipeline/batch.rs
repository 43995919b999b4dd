// Batch coordinator — bounded-concurrency processing of a batch's creators.
//
// At most N creators are in flight at once; a finishing creator frees its
// slot immediately, so admission is a sliding window rather than lockstep
// waves. The configured wave delay paces admissions once the window is
// full. Each creator is a bulkhead: its driver returns a terminal outcome
// and never takes siblings down with it.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

use super::creator::{self, CreatorOutcome};
use super::PipelineCtx;
use crate::db::models::{BatchStatus, Creator};
use crate::events::{BatchMetrics, StreamEvent};

/// Process every non-terminal creator in a batch, then finalize the batch.
///
/// Creators already in a terminal state (from an earlier run) are left
/// alone and still counted in the final metrics. Returns the metrics also
/// carried on the `batch_completed` event.
pub async fn run_batch(ctx: Arc<PipelineCtx>, batch_id: &str) -> Result<BatchMetrics> {
    let batch = ctx
        .db
        .get_batch(batch_id)
        .await?
        .with_context(|| format!("Batch {batch_id} not found"))?;

    let creators = ctx.db.get_creators_for_batch(batch_id).await?;
    let pending: Vec<Creator> = creators
        .iter()
        .filter(|c| !c.status.is_terminal())
        .cloned()
        .collect();

    ctx.db
        .set_batch_status(batch_id, BatchStatus::Processing)
        .await?;

    let concurrency = ctx.limits.creator_concurrency.max(1);
    let wave_delay = Duration::from_millis(ctx.limits.wave_delay_ms);
    info!(
        batch = batch.name,
        creators = pending.len(),
        concurrency,
        "Starting batch run"
    );

    let started = Instant::now();

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Vetting [{bar:30}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let outcomes: Vec<CreatorOutcome> =
        stream::iter(pending.iter().enumerate().map(|(index, item)| {
            let ctx = Arc::clone(&ctx);
            let pb = pb.clone();
            async move {
                // Pace admissions beyond the first window so a burst of
                // short creators doesn't hammer the providers all at once.
                if index >= concurrency && !wave_delay.is_zero() {
                    tokio::time::sleep(wave_delay).await;
                }
                let outcome = creator::process_creator(&ctx, item).await;
                pb.inc(1);
                outcome
            }
        }))
        .buffer_unordered(concurrency)
        .collect()
        .await;
    pb.finish_and_clear();

    // Every processed creator reached a terminal state; the counts come
    // from the store so creators terminal before this run are included.
    let (total, completed, failed) = ctx.db.batch_progress(batch_id).await?;
    let all_terminal = completed + failed == total;
    if !all_terminal {
        // Should not happen: the driver always lands on a terminal status.
        warn!(
            batch = batch.name,
            total, completed, failed, "Batch finished with non-terminal creators"
        );
    }

    let duration = started.elapsed();
    let minutes = (duration.as_secs_f64() / 60.0).max(1.0 / 60_000.0);
    let total_posts: u32 = outcomes.iter().map(|o| o.posts_analyzed).sum();
    let metrics = BatchMetrics {
        duration_ms: duration.as_millis() as u64,
        total_creators: total,
        completed_creators: completed,
        failed_creators: failed,
        total_posts,
        creators_per_minute: outcomes.len() as f64 / minutes,
        posts_per_minute: total_posts as f64 / minutes,
        concurrency_used: concurrency as u32,
    };

    if all_terminal {
        ctx.db
            .set_batch_status(batch_id, BatchStatus::Completed)
            .await?;
        ctx.bus.publish(StreamEvent::BatchCompleted {
            batch_id: batch_id.to_string(),
            status: BatchStatus::Completed,
            metrics: metrics.clone(),
            timestamp: Utc::now(),
        });
    }

    info!(
        batch = batch.name,
        duration_ms = metrics.duration_ms,
        completed = metrics.completed_creators,
        failed = metrics.failed_creators,
        posts = metrics.total_posts,
        "Batch run finished"
    );

    Ok(metrics)
}
