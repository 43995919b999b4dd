// Batch pipeline — the coordinator and the per-creator driver.

pub mod batch;
pub mod creator;

use std::sync::Arc;

use crate::analysis::brands::BrandDetector;
use crate::analysis::keywords::KeywordScreener;
use crate::analysis::media::MediaAnalyzer;
use crate::analysis::prescreen::VisionPreScreener;
use crate::analysis::rate_limit::AnalysisPools;
use crate::config::PipelineLimits;
use crate::db::Database;
use crate::events::EventBus;
use crate::platforms::AdapterSet;
use crate::search::SearchProvider;

/// Everything a batch run needs, built once and shared by every creator
/// task. All configuration is explicit and immutable — tests inject
/// deterministic limits (e.g. concurrency 1) without process-wide state.
pub struct PipelineCtx {
    pub db: Arc<dyn Database>,
    pub adapters: AdapterSet,
    pub screener: KeywordScreener,
    pub brands: Arc<dyn BrandDetector>,
    pub prescreener: Arc<dyn VisionPreScreener>,
    pub media: Arc<dyn MediaAnalyzer>,
    pub search: Arc<dyn SearchProvider>,
    pub pools: AnalysisPools,
    pub bus: Arc<EventBus>,
    pub limits: PipelineLimits,
    pub lookback_months: u32,
    pub competitor_brands: Vec<String>,
}
