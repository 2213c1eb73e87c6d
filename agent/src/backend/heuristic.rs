//! Rule-based backend used when no model capability is configured.

use crate::backend::{BackendKind, DecideRequest, ReasoningBackend, SynthesizeRequest};
use crate::core::heuristic;
use crate::core::types::Decision;
use crate::error::BackendError;

/// Deterministic backend: same inputs, same outputs, never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicBackend;

impl ReasoningBackend for HeuristicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Heuristic
    }

    fn decide(&self, request: &DecideRequest<'_>) -> Result<Decision, BackendError> {
        Ok(heuristic::decide(
            &request.task.description,
            request.task.depth,
            request.allow_decompose,
        ))
    }

    fn synthesize(&self, request: &SynthesizeRequest<'_>) -> Result<String, BackendError> {
        Ok(heuristic::synthesize(
            &request.task.description,
            request.child_results,
        ))
    }
}
