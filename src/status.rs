// System status — batch/report counts and configuration visibility.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::db::Database;

/// Print a status summary: database location, batch counts by status,
/// report counts by risk level, cache size, and which analysis tiers are
/// configured.
pub async fn show(db: &Arc<dyn Database>, config: &Config) -> Result<()> {
    println!("{}", "Greenlight status".bold());
    println!("  Database: {}", config.db_path);

    let batches = db.count_batches_by_status().await?;
    if batches.is_empty() {
        println!("  Batches:  none yet");
    } else {
        println!("  Batches:");
        for (status, count) in batches {
            println!("    {status:<12} {count}");
        }
    }

    let reports = db.count_reports_by_risk().await?;
    if reports.is_empty() {
        println!("  Reports:  none yet");
    } else {
        println!("  Reports by risk:");
        for (risk, count) in reports {
            println!("    {risk:<12} {count}");
        }
    }

    let cached = db.count_cached_posts().await?;
    println!("  Cached posts: {cached}");

    println!("  Tiers:");
    print_tier("brand detection", config.brand_detection_configured());
    print_tier("pre-screening", config.prescreen_configured());
    print_tier("media analysis", config.media_analysis_configured());
    print_tier("background search", config.search_configured());

    println!(
        "  Limits: {} creators, {} video ({}/s), {} image ({}/s), {} brand, {} scrape",
        config.limits.creator_concurrency,
        config.limits.video_concurrency,
        config.limits.video_rps,
        config.limits.image_concurrency,
        config.limits.image_rps,
        config.limits.brand_concurrency,
        config.limits.scrape_concurrency,
    );
    println!(
        "  Retry (unused): {} attempts, {}ms base delay",
        config.retry.max_attempts, config.retry.base_delay_ms,
    );

    Ok(())
}

fn print_tier(name: &str, configured: bool) {
    if configured {
        println!("    {name:<18} {}", "configured".green());
    } else {
        println!("    {name:<18} {}", "disabled".yellow());
    }
}
