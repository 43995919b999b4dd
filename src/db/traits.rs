// Database trait — backend-agnostic async interface for all DB operations.
//
// Implemented by SqliteDatabase (wraps rusqlite). All methods are async so a
// native-async backend fits behind the same interface later. The trait
// mirrors the queries.rs function signatures, so callers hold an
// `Arc<dyn Database>` and never see rusqlite directly.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Batch, BatchStatus, CachedPost, Creator, CreatorStatus, Report};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Batches ---

    async fn create_batch(&self, batch: &Batch) -> Result<()>;

    async fn get_batch(&self, id: &str) -> Result<Option<Batch>>;

    async fn list_batches(&self) -> Result<Vec<Batch>>;

    async fn set_batch_status(&self, id: &str, status: BatchStatus) -> Result<()>;

    /// (total, completed, failed) creator counts for a batch.
    async fn batch_progress(&self, batch_id: &str) -> Result<(u32, u32, u32)>;

    // --- Creators ---

    async fn insert_creator(&self, creator: &Creator) -> Result<()>;

    async fn get_creator(&self, id: &str) -> Result<Option<Creator>>;

    async fn get_creators_for_batch(&self, batch_id: &str) -> Result<Vec<Creator>>;

    /// Advance a creator through its forward-only lifecycle.
    /// Returns false (and leaves the row untouched) for illegal transitions.
    async fn advance_creator_status(
        &self,
        id: &str,
        next: CreatorStatus,
        error: Option<&str>,
    ) -> Result<bool>;

    /// Record one platform's fetch outcome on the creator row.
    async fn set_platform_status(
        &self,
        creator_id: &str,
        platform: &str,
        status: &str,
    ) -> Result<()>;

    /// Creators stuck in PENDING/PROCESSING older than `stale_minutes`.
    async fn find_stale_creators(&self, stale_minutes: i64) -> Result<Vec<Creator>>;

    // --- Reports ---

    async fn get_report_for_creator(&self, creator_id: &str) -> Result<Option<Report>>;

    /// Plain write — callers construct the merged value first.
    async fn save_report(&self, report: &Report) -> Result<()>;

    /// Report id already referencing this external analysis id, if any.
    async fn find_report_linking_analysis(&self, provider_id: &str) -> Result<Option<String>>;

    // --- Content cache ---

    async fn insert_cached_post(&self, post: &CachedPost) -> Result<()>;

    /// Pre-transcribed posts for handle+platform within the lookback window.
    async fn get_cached_posts(
        &self,
        handle: &str,
        platform: &str,
        lookback_months: u32,
    ) -> Result<Vec<CachedPost>>;

    // --- Status counts ---

    async fn count_batches_by_status(&self) -> Result<Vec<(String, u32)>>;

    async fn count_reports_by_risk(&self) -> Result<Vec<(String, u32)>>;

    async fn count_cached_posts(&self) -> Result<u32>;
}
