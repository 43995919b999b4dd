// Event stream — typed progress events for an active batch run.
//
// One EventBus exists per batch run. Events are broadcast forward-only:
// a subscriber joining mid-run sees events from that point on, and there is
// no replay from an arbitrary offset. Each event is stamped with a
// monotonically increasing per-batch sequence number so resume-from-offset
// can be added later without changing the vocabulary.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::db::models::{BatchStatus, FindingType, RiskLevel, Severity};

/// Named analysis step reported via `analysis_step` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStep {
    Validation,
    ContentAnalysis,
    BrandDetection,
    ProfanityCheck,
    CompetitorAnalysis,
    RationaleGeneration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Started,
    Completed,
}

/// Aggregate metrics carried on the final `batch_completed` event.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetrics {
    pub duration_ms: u64,
    pub total_creators: u32,
    pub completed_creators: u32,
    pub failed_creators: u32,
    pub total_posts: u32,
    pub creators_per_minute: f64,
    pub posts_per_minute: f64,
    pub concurrency_used: u32,
}

/// The closed set of progress events published during a batch run.
///
/// Per creator the stream is: one `creator_started`, interleaved progress
/// events, then exactly one terminal event (`creator_completed` or
/// `creator_failed`) with nothing for that creator after it. One
/// `batch_completed` ends the stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    SearchStarted {
        creator_id: String,
        search_id: String,
        query: String,
        source: String,
        timestamp: DateTime<Utc>,
    },
    SearchCompleted {
        creator_id: String,
        search_id: String,
        query: String,
        source: String,
        results_count: u32,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    PlatformStarted {
        creator_id: String,
        platform: String,
        timestamp: DateTime<Utc>,
    },
    PlatformCompleted {
        creator_id: String,
        platform: String,
        posts_count: u32,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    AnalysisStep {
        creator_id: String,
        step: AnalysisStep,
        status: StepStatus,
        timestamp: DateTime<Utc>,
    },
    FindingDiscovered {
        creator_id: String,
        title: String,
        severity: Severity,
        #[serde(rename = "type")]
        finding_type: FindingType,
        source: String,
        timestamp: DateTime<Utc>,
    },
    CreatorStarted {
        creator_id: String,
        name: String,
        timestamp: DateTime<Utc>,
    },
    CreatorCompleted {
        creator_id: String,
        name: String,
        risk_level: RiskLevel,
        findings_count: u32,
        summary: String,
        timestamp: DateTime<Utc>,
    },
    CreatorFailed {
        creator_id: String,
        name: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    BatchCompleted {
        batch_id: String,
        status: BatchStatus,
        metrics: BatchMetrics,
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    /// The creator this event belongs to, if any.
    pub fn creator_id(&self) -> Option<&str> {
        match self {
            StreamEvent::SearchStarted { creator_id, .. }
            | StreamEvent::SearchCompleted { creator_id, .. }
            | StreamEvent::PlatformStarted { creator_id, .. }
            | StreamEvent::PlatformCompleted { creator_id, .. }
            | StreamEvent::AnalysisStep { creator_id, .. }
            | StreamEvent::FindingDiscovered { creator_id, .. }
            | StreamEvent::CreatorStarted { creator_id, .. }
            | StreamEvent::CreatorCompleted { creator_id, .. }
            | StreamEvent::CreatorFailed { creator_id, .. } => Some(creator_id),
            StreamEvent::BatchCompleted { .. } => None,
        }
    }

    pub fn is_terminal_for_creator(&self) -> bool {
        matches!(
            self,
            StreamEvent::CreatorCompleted { .. } | StreamEvent::CreatorFailed { .. }
        )
    }
}

/// An event plus its per-batch sequence number.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub seq: u64,
    #[serde(flatten)]
    pub event: StreamEvent,
}

/// Broadcast bus for one batch run.
///
/// Delivery is at-least-once to connected subscribers; a slow subscriber
/// that falls more than `capacity` events behind sees a lag error from the
/// broadcast receiver rather than blocking the pipeline.
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
    seq: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            seq: AtomicU64::new(0),
        }
    }

    /// Subscribe to all future events. Events published before subscription
    /// are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Publish an event, stamping the next sequence number.
    /// Returns the assigned sequence number. Publishing with no subscribers
    /// is not an error — the pipeline runs the same with or without
    /// observers.
    pub fn publish(&self, event: StreamEvent) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        if self.tx.send(Envelope { seq, event }).is_err() {
            debug!(seq, "No subscribers for event");
        }
        seq
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
