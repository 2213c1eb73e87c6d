//! Reasoning backends consulted by the planner.
//!
//! The planner only sees [`ReasoningBackend`]; the concrete variant is chosen
//! once per run by the orchestrator.

use crate::core::types::{Decision, Task};
use crate::error::BackendError;

pub mod heuristic;
pub mod model;

pub use heuristic::HeuristicBackend;
pub use model::ModelBackend;

/// Which backend variant served a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Model,
    Heuristic,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Model => "model-assisted",
            BackendKind::Heuristic => "heuristic",
        }
    }
}

/// Inputs for a decompose-or-solve call.
#[derive(Debug, Clone)]
pub struct DecideRequest<'a> {
    pub goal: &'a str,
    pub task: &'a Task,
    /// Iterations left after this decision was charged.
    pub remaining: u32,
    /// Planner verdict from depth and budget; backends must solve when false.
    pub allow_decompose: bool,
    pub max_subtasks: u32,
    pub max_depth: u32,
}

/// Inputs for merging child results into a parent result.
#[derive(Debug, Clone)]
pub struct SynthesizeRequest<'a> {
    pub goal: &'a str,
    pub task: &'a Task,
    pub child_results: &'a [String],
}

pub trait ReasoningBackend {
    fn kind(&self) -> BackendKind;

    fn decide(&self, request: &DecideRequest<'_>) -> Result<Decision, BackendError>;

    fn synthesize(&self, request: &SynthesizeRequest<'_>) -> Result<String, BackendError>;
}
