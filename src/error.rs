// Pipeline error taxonomy.
//
// These variants classify failures at the points where they are recorded:
// a fetch error lands on one platform's result, an analysis error resolves
// to the conservative default for its tier (or fails the creator when the
// full analyzer itself breaks), a config error disables the dependent tier,
// and a recovery error is surfaced to the operator without automatic retry.
//
// The application boundary (CLI, db plumbing) stays on anyhow; this enum is
// for the places where the class of failure changes what happens next.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A platform fetch failed or returned nothing usable.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// An analysis tier's external call failed.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// A required credential or endpoint is absent.
    #[error("missing configuration: {0}")]
    Config(String),

    /// Reconciliation could not locate or parse a provider result.
    #[error("recovery failed: {0}")]
    Recovery(String),
}

impl PipelineError {
    pub fn fetch(err: impl std::fmt::Display) -> Self {
        PipelineError::Fetch(err.to_string())
    }
}
