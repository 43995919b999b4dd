// Terminal rendering for reports, screen results, and live batch events.

use colored::Colorize;

use crate::analysis::keywords::ScreenResult;
use crate::db::models::{Creator, Report, RiskLevel};
use crate::events::{Envelope, StreamEvent};
use crate::output::truncate_chars;

fn risk_colored(risk: RiskLevel) -> String {
    let s = risk.as_str();
    match risk {
        RiskLevel::Critical => s.red().bold().to_string(),
        RiskLevel::High => s.red().to_string(),
        RiskLevel::Medium => s.yellow().to_string(),
        RiskLevel::Low => s.green().to_string(),
        RiskLevel::Unknown => s.dimmed().to_string(),
    }
}

/// Print the per-creator reports for a batch.
pub fn display_batch_reports(rows: &[(Creator, Option<Report>)]) {
    println!(
        "  {:<4} {:<28} {:<10} {:>8}  Risk",
        "#", "Creator", "Status", "Findings"
    );
    println!("  {}", "-".repeat(70));

    for (i, (creator, report)) in rows.iter().enumerate() {
        match report {
            Some(report) => {
                println!(
                    "  {:<4} {:<28} {:<10} {:>8}  {}",
                    format!("{}.", i + 1),
                    truncate_chars(&creator.name, 28),
                    creator.status.as_str(),
                    report.findings.len(),
                    risk_colored(report.risk_level),
                );
                if !report.summary.is_empty() {
                    println!("        {}", truncate_chars(&report.summary, 100).dimmed());
                }
            }
            None => {
                let note = creator
                    .error
                    .as_deref()
                    .map(|e| truncate_chars(e, 60))
                    .unwrap_or_else(|| "no report".to_string());
                println!(
                    "  {:<4} {:<28} {:<10} {:>8}  {}",
                    format!("{}.", i + 1),
                    truncate_chars(&creator.name, 28),
                    creator.status.as_str(),
                    "-",
                    note.dimmed(),
                );
            }
        }
    }
}

/// Print a tier-1 screen result for the `screen` command.
pub fn display_screen_result(text: &str, result: &ScreenResult) {
    println!("  Text: {}", truncate_chars(text, 80).dimmed());
    match &result.risk_hint {
        Some(hint) => println!("  Risk hint: {}", hint.as_str().yellow()),
        None => println!("  Risk hint: {}", "none".green()),
    }
    if result.matches.is_empty() {
        println!("  No flagged terms.");
    } else {
        println!("  Flagged terms:");
        for m in &result.matches {
            println!("    {:<20} {} ({})", m.term, m.category, m.severity);
        }
    }
}

/// One-line rendering of a live pipeline event.
pub fn display_event(envelope: &Envelope) {
    let line = match &envelope.event {
        StreamEvent::CreatorStarted { name, .. } => format!("▶ {name}"),
        StreamEvent::CreatorCompleted {
            name, risk_level, findings_count, ..
        } => format!(
            "✓ {name} — {} ({findings_count} findings)",
            risk_colored(*risk_level)
        ),
        StreamEvent::CreatorFailed { name, error, .. } => {
            format!("✗ {name} — {}", truncate_chars(error, 60).red())
        }
        StreamEvent::PlatformCompleted {
            platform, posts_count, ..
        } => format!("  {platform}: {posts_count} posts"),
        StreamEvent::FindingDiscovered { title, severity, .. } => {
            format!("  ! {title} ({severity})")
        }
        StreamEvent::BatchCompleted { metrics, .. } => format!(
            "Batch complete: {}/{} creators, {} posts, {:.1}/min",
            metrics.completed_creators,
            metrics.total_creators,
            metrics.total_posts,
            metrics.creators_per_minute,
        ),
        // Step/search/platform-start events stay quiet in terminal mode
        _ => return,
    };
    println!("{line}");
}
