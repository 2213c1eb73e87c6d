//! Error taxonomy surfaced to callers of the agent.

use thiserror::Error;

/// Whole-run failures. Everything else is recovered inside the planner.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Rejected before planning started (maps to a 400 response).
    #[error("{0}")]
    InvalidInput(String),
    /// Unexpected failure; the run is aborted (maps to a 500 response).
    #[error("internal fault: {0:#}")]
    InternalFault(#[from] anyhow::Error),
}

/// Failure of a single reasoning-backend call.
///
/// Always recoverable: the planner logs it to the trace and degrades.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("model call failed: {0:#}")]
    Call(anyhow::Error),
    #[error("model call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("model reply rejected: {0}")]
    InvalidReply(String),
}
