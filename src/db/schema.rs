// Database schema — table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run, and each migration is a function that
// executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- A named group of creators submitted together for vetting
        CREATE TABLE IF NOT EXISTS batches (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            search_terms TEXT,
            owner TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            completed_at TEXT
        );

        -- Creators being vetted; each belongs to exactly one batch
        CREATE TABLE IF NOT EXISTS creators (
            id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL REFERENCES batches(id),
            name TEXT NOT NULL,
            social_links TEXT NOT NULL,        -- JSON array of profile URLs
            platform_status TEXT,              -- JSON map platform -> fetch status
            status TEXT NOT NULL DEFAULT 'PENDING',
            error TEXT,                        -- short message when FAILED
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One report per creator, created on first successful analysis
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            creator_id TEXT NOT NULL UNIQUE REFERENCES creators(id),
            risk_level TEXT NOT NULL,
            summary TEXT NOT NULL,
            findings TEXT NOT NULL,            -- JSON array of findings
            search_queries TEXT NOT NULL,      -- JSON array of executed queries
            raw_results TEXT NOT NULL,         -- JSON object keyed by provider
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Pre-transcribed content cache, consulted before live fetching
        CREATE TABLE IF NOT EXISTS cached_posts (
            id TEXT PRIMARY KEY,
            handle TEXT NOT NULL,
            platform TEXT NOT NULL,
            caption TEXT,
            transcript TEXT,
            media_url TEXT,
            media_kind TEXT,                   -- 'image' or 'video'
            posted_at TEXT NOT NULL,
            cached_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Index for listing a batch's creators
        CREATE INDEX IF NOT EXISTS idx_creators_batch
            ON creators(batch_id);

        -- Index for finding stuck creators by status and age
        CREATE INDEX IF NOT EXISTS idx_creators_status_updated
            ON creators(status, updated_at);

        -- Index for cache lookups by handle + platform + window
        CREATE INDEX IF NOT EXISTS idx_cached_posts_lookup
            ON cached_posts(handle, platform, posted_at);
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
/// The migration function receives the connection and should execute its SQL.
#[allow(dead_code)]
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        // Running create_tables twice should not error
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // schema_version, batches, creators, reports, cached_posts = 5 tables
        assert_eq!(table_count(&conn).unwrap(), 5i64);
    }
}
