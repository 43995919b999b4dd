// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points — Rust enforces this because
// MutexGuard is !Send.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{Batch, BatchStatus, CachedPost, Creator, CreatorStatus, Report};
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn create_batch(&self, batch: &Batch) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::create_batch(&conn, batch)
    }

    async fn get_batch(&self, id: &str) -> Result<Option<Batch>> {
        let conn = self.conn.lock().await;
        super::queries::get_batch(&conn, id)
    }

    async fn list_batches(&self) -> Result<Vec<Batch>> {
        let conn = self.conn.lock().await;
        super::queries::list_batches(&conn)
    }

    async fn set_batch_status(&self, id: &str, status: BatchStatus) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_batch_status(&conn, id, status)
    }

    async fn batch_progress(&self, batch_id: &str) -> Result<(u32, u32, u32)> {
        let conn = self.conn.lock().await;
        super::queries::batch_progress(&conn, batch_id)
    }

    async fn insert_creator(&self, creator: &Creator) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::insert_creator(&conn, creator)
    }

    async fn get_creator(&self, id: &str) -> Result<Option<Creator>> {
        let conn = self.conn.lock().await;
        super::queries::get_creator(&conn, id)
    }

    async fn get_creators_for_batch(&self, batch_id: &str) -> Result<Vec<Creator>> {
        let conn = self.conn.lock().await;
        super::queries::get_creators_for_batch(&conn, batch_id)
    }

    async fn advance_creator_status(
        &self,
        id: &str,
        next: CreatorStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::advance_creator_status(&conn, id, next, error)
    }

    async fn set_platform_status(
        &self,
        creator_id: &str,
        platform: &str,
        status: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_platform_status(&conn, creator_id, platform, status)
    }

    async fn find_stale_creators(&self, stale_minutes: i64) -> Result<Vec<Creator>> {
        let conn = self.conn.lock().await;
        super::queries::find_stale_creators(&conn, stale_minutes)
    }

    async fn get_report_for_creator(&self, creator_id: &str) -> Result<Option<Report>> {
        let conn = self.conn.lock().await;
        super::queries::get_report_for_creator(&conn, creator_id)
    }

    async fn save_report(&self, report: &Report) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::save_report(&conn, report)
    }

    async fn find_report_linking_analysis(&self, provider_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::find_report_linking_analysis(&conn, provider_id)
    }

    async fn insert_cached_post(&self, post: &CachedPost) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::insert_cached_post(&conn, post)
    }

    async fn get_cached_posts(
        &self,
        handle: &str,
        platform: &str,
        lookback_months: u32,
    ) -> Result<Vec<CachedPost>> {
        let conn = self.conn.lock().await;
        super::queries::get_cached_posts(&conn, handle, platform, lookback_months)
    }

    async fn count_batches_by_status(&self) -> Result<Vec<(String, u32)>> {
        let conn = self.conn.lock().await;
        super::queries::count_batches_by_status(&conn)
    }

    async fn count_reports_by_risk(&self) -> Result<Vec<(String, u32)>> {
        let conn = self.conn.lock().await;
        super::queries::count_reports_by_risk(&conn)
    }

    async fn count_cached_posts(&self) -> Result<u32> {
        let conn = self.conn.lock().await;
        super::queries::count_cached_posts(&conn)
    }
}
