// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{Batch, BatchStatus, CachedPost, Creator, CreatorStatus, Report, RiskLevel};

// --- Batches ---

pub fn create_batch(conn: &Connection, batch: &Batch) -> Result<()> {
    conn.execute(
        "INSERT INTO batches (id, name, status, search_terms, owner)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            batch.id,
            batch.name,
            batch.status.as_str(),
            batch.search_terms,
            batch.owner,
        ],
    )?;
    Ok(())
}

pub fn get_batch(conn: &Connection, id: &str) -> Result<Option<Batch>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, status, search_terms, owner, created_at, completed_at
         FROM batches WHERE id = ?1",
    )?;
    let row = stmt
        .query_row(params![id], |row| {
            Ok(Batch {
                id: row.get(0)?,
                name: row.get(1)?,
                status: BatchStatus::parse(&row.get::<_, String>(2)?),
                search_terms: row.get(3)?,
                owner: row.get(4)?,
                created_at: row.get(5)?,
                completed_at: row.get(6)?,
            })
        })
        .optional()?;
    Ok(row)
}

pub fn list_batches(conn: &Connection) -> Result<Vec<Batch>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, status, search_terms, owner, created_at, completed_at
         FROM batches ORDER BY created_at DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Batch {
                id: row.get(0)?,
                name: row.get(1)?,
                status: BatchStatus::parse(&row.get::<_, String>(2)?),
                search_terms: row.get(3)?,
                owner: row.get(4)?,
                created_at: row.get(5)?,
                completed_at: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Update a batch's status; stamps completed_at when the status is terminal.
pub fn set_batch_status(conn: &Connection, id: &str, status: BatchStatus) -> Result<()> {
    let terminal = matches!(status, BatchStatus::Completed | BatchStatus::Failed);
    if terminal {
        conn.execute(
            "UPDATE batches SET status = ?2, completed_at = datetime('now') WHERE id = ?1",
            params![id, status.as_str()],
        )?;
    } else {
        conn.execute(
            "UPDATE batches SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
    }
    Ok(())
}

// --- Creators ---

pub fn insert_creator(conn: &Connection, creator: &Creator) -> Result<()> {
    let links_json = serde_json::to_string(&creator.social_links)?;
    let platform_json = serde_json::to_string(&creator.platform_status)?;
    conn.execute(
        "INSERT INTO creators (id, batch_id, name, social_links, platform_status, status, error)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            creator.id,
            creator.batch_id,
            creator.name,
            links_json,
            platform_json,
            creator.status.as_str(),
            creator.error,
        ],
    )?;
    Ok(())
}

fn creator_from_raw(
    raw: (
        String,
        String,
        String,
        String,
        Option<String>,
        String,
        Option<String>,
        String,
        String,
    ),
) -> Result<Creator> {
    let (id, batch_id, name, links_json, platform_json, status, error, created_at, updated_at) =
        raw;
    let social_links =
        serde_json::from_str(&links_json).context("Malformed social_links JSON")?;
    let platform_status = match platform_json {
        Some(json) => serde_json::from_str(&json).context("Malformed platform_status JSON")?,
        None => Default::default(),
    };
    Ok(Creator {
        id,
        batch_id,
        name,
        social_links,
        platform_status,
        status: CreatorStatus::parse(&status),
        error,
        created_at,
        updated_at,
    })
}

const CREATOR_COLUMNS: &str =
    "id, batch_id, name, social_links, platform_status, status, error, created_at, updated_at";

pub fn get_creator(conn: &Connection, id: &str) -> Result<Option<Creator>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CREATOR_COLUMNS} FROM creators WHERE id = ?1"
    ))?;
    let raw = stmt
        .query_row(params![id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        })
        .optional()?;
    raw.map(creator_from_raw).transpose()
}

pub fn get_creators_for_batch(conn: &Connection, batch_id: &str) -> Result<Vec<Creator>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CREATOR_COLUMNS} FROM creators WHERE batch_id = ?1 ORDER BY created_at"
    ))?;
    let raws = stmt
        .query_map(params![batch_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(creator_from_raw).collect()
}

/// Advance a creator's status, enforcing the forward-only lifecycle.
///
/// Returns true when the row changed. An illegal (backward or redundant)
/// transition leaves the row untouched and returns false so callers can log
/// it without tearing down the pipeline.
pub fn advance_creator_status(
    conn: &Connection,
    id: &str,
    next: CreatorStatus,
    error: Option<&str>,
) -> Result<bool> {
    let current: Option<String> = conn
        .query_row(
            "SELECT status FROM creators WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let current = match current {
        Some(s) => CreatorStatus::parse(&s),
        None => anyhow::bail!("Creator {id} not found"),
    };

    if !current.can_advance_to(next) {
        return Ok(false);
    }

    conn.execute(
        "UPDATE creators SET status = ?2, error = ?3, updated_at = datetime('now')
         WHERE id = ?1",
        params![id, next.as_str(), error],
    )?;
    Ok(true)
}

/// Record a platform fetch outcome on the creator's platform_status map.
pub fn set_platform_status(
    conn: &Connection,
    creator_id: &str,
    platform: &str,
    status: &str,
) -> Result<()> {
    let existing: Option<Option<String>> = conn
        .query_row(
            "SELECT platform_status FROM creators WHERE id = ?1",
            params![creator_id],
            |row| row.get(0),
        )
        .optional()?;
    let mut map: std::collections::BTreeMap<String, String> = match existing.flatten() {
        Some(json) => serde_json::from_str(&json).unwrap_or_default(),
        None => Default::default(),
    };
    map.insert(platform.to_string(), status.to_string());
    conn.execute(
        "UPDATE creators SET platform_status = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![creator_id, serde_json::to_string(&map)?],
    )?;
    Ok(())
}

/// Count a batch's creators by terminal state: (total, completed, failed).
pub fn batch_progress(conn: &Connection, batch_id: &str) -> Result<(u32, u32, u32)> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(status = 'COMPLETED'), 0),
                COALESCE(SUM(status = 'FAILED'), 0)
         FROM creators WHERE batch_id = ?1",
        params![batch_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .context("Failed to count batch progress")
}

/// Creators stuck in PENDING/PROCESSING whose updated_at is older than the
/// given number of minutes. Candidates for recovery.
pub fn find_stale_creators(conn: &Connection, stale_minutes: i64) -> Result<Vec<Creator>> {
    let modifier = format!("-{stale_minutes} minutes");
    let mut stmt = conn.prepare(&format!(
        "SELECT {CREATOR_COLUMNS} FROM creators
         WHERE status IN ('PENDING', 'PROCESSING')
           AND updated_at <= datetime('now', ?1)
         ORDER BY updated_at"
    ))?;
    let raws = stmt
        .query_map(params![modifier], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(creator_from_raw).collect()
}

// --- Reports ---

fn report_from_raw(
    raw: (
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
    ),
) -> Result<Report> {
    let (
        id,
        creator_id,
        risk_level,
        summary,
        findings_json,
        queries_json,
        raw_json,
        created_at,
        updated_at,
    ) = raw;
    Ok(Report {
        id,
        creator_id,
        risk_level: RiskLevel::parse(&risk_level),
        summary,
        findings: serde_json::from_str(&findings_json).context("Malformed findings JSON")?,
        search_queries: serde_json::from_str(&queries_json)
            .context("Malformed search_queries JSON")?,
        raw_results: serde_json::from_str(&raw_json).context("Malformed raw_results JSON")?,
        created_at,
        updated_at,
    })
}

const REPORT_COLUMNS: &str =
    "id, creator_id, risk_level, summary, findings, search_queries, raw_results, created_at, updated_at";

pub fn get_report_for_creator(conn: &Connection, creator_id: &str) -> Result<Option<Report>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE creator_id = ?1"
    ))?;
    let raw = stmt
        .query_row(params![creator_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
            ))
        })
        .optional()?;
    raw.map(report_from_raw).transpose()
}

/// Insert a report or overwrite its mutable fields.
///
/// Callers are responsible for building the merged value first (risk level
/// only ever raised, raw_results keys only ever added) — this function is a
/// plain write.
pub fn save_report(conn: &Connection, report: &Report) -> Result<()> {
    let findings_json = serde_json::to_string(&report.findings)?;
    let queries_json = serde_json::to_string(&report.search_queries)?;
    let raw_json = serde_json::to_string(&report.raw_results)?;
    conn.execute(
        "INSERT INTO reports (id, creator_id, risk_level, summary, findings, search_queries, raw_results)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(creator_id) DO UPDATE SET
            risk_level = ?3,
            summary = ?4,
            findings = ?5,
            search_queries = ?6,
            raw_results = ?7,
            updated_at = datetime('now')",
        params![
            report.id,
            report.creator_id,
            report.risk_level.as_str(),
            report.summary,
            findings_json,
            queries_json,
            raw_json,
        ],
    )?;
    Ok(())
}

/// Find a report already referencing the given external analysis id anywhere
/// in its raw_results payload. Used by recovery to skip analyses that are
/// already linked. Matches on the JSON-quoted id, which is stable because
/// provider ids are opaque tokens, never substrings of each other.
pub fn find_report_linking_analysis(conn: &Connection, provider_id: &str) -> Result<Option<String>> {
    let needle = format!("%\"{provider_id}\"%");
    let id = conn
        .query_row(
            "SELECT id FROM reports WHERE raw_results LIKE ?1 LIMIT 1",
            params![needle],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

// --- Content cache ---

pub fn insert_cached_post(conn: &Connection, post: &CachedPost) -> Result<()> {
    conn.execute(
        "INSERT INTO cached_posts (id, handle, platform, caption, transcript, media_url, media_kind, posted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            post.id,
            post.handle,
            post.platform,
            post.caption,
            post.transcript,
            post.media_url,
            post.media_kind,
            post.posted_at,
        ],
    )?;
    Ok(())
}

/// Cached posts for a handle within the lookback window, newest first.
pub fn get_cached_posts(
    conn: &Connection,
    handle: &str,
    platform: &str,
    lookback_months: u32,
) -> Result<Vec<CachedPost>> {
    let modifier = format!("-{lookback_months} months");
    let mut stmt = conn.prepare(
        "SELECT id, handle, platform, caption, transcript, media_url, media_kind, posted_at, cached_at
         FROM cached_posts
         WHERE handle = ?1 AND platform = ?2 AND posted_at >= datetime('now', ?3)
         ORDER BY posted_at DESC",
    )?;
    let rows = stmt
        .query_map(params![handle, platform, modifier], |row| {
            Ok(CachedPost {
                id: row.get(0)?,
                handle: row.get(1)?,
                platform: row.get(2)?,
                caption: row.get(3)?,
                transcript: row.get(4)?,
                media_url: row.get(5)?,
                media_kind: row.get(6)?,
                posted_at: row.get(7)?,
                cached_at: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// --- Status counts ---

pub fn count_batches_by_status(conn: &Connection) -> Result<Vec<(String, u32)>> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM batches GROUP BY status ORDER BY status")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn count_reports_by_risk(conn: &Connection) -> Result<Vec<(String, u32)>> {
    let mut stmt =
        conn.prepare("SELECT risk_level, COUNT(*) FROM reports GROUP BY risk_level")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn count_cached_posts(conn: &Connection) -> Result<u32> {
    let count = conn.query_row("SELECT COUNT(*) FROM cached_posts", [], |row| row.get(0))?;
    Ok(count)
}
