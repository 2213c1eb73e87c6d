//! Run orchestration: validate input, pick a backend, plan, assemble the run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::backend::{BackendKind, HeuristicBackend, ModelBackend, ReasoningBackend};
use crate::core::invariants::{RunTotals, validate_run};
use crate::core::limits::{Limits, LimitsInput};
use crate::core::types::{AgentLogEntry, EntryKind};
use crate::error::AgentError;
use crate::io::config::AgentConfig;
use crate::io::model::{CommandModel, ModelCapability, ReasoningModel};
use crate::planner::{CancelFlag, Planner, RunControl};
use crate::trace::TraceRecorder;

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Timing metadata of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
}

/// Complete, immutable output of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub goal: String,
    pub steps: Vec<AgentLogEntry>,
    pub conclusion: String,
    pub iterations: u32,
    pub depth_reached: u32,
    pub used_model: bool,
    /// False when the run was cancelled or ran out of wall-clock time.
    pub completed: bool,
    pub metadata: RunMetadata,
}

/// Top-level driver for agent runs.
///
/// The backend variant is fixed by the [`ModelCapability`] given at
/// construction and never re-evaluated during a run.
pub struct Orchestrator {
    config: AgentConfig,
    capability: ModelCapability,
    model: Option<Box<dyn ReasoningModel>>,
    cancel: CancelFlag,
    timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(config: AgentConfig, capability: ModelCapability) -> Self {
        Self {
            config,
            capability,
            model: None,
            cancel: CancelFlag::new(),
            timeout: None,
        }
    }

    /// Replace the command-spawning model transport.
    pub fn with_model(mut self, model: Box<dyn ReasoningModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Share a cancel flag with the caller.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Bound each run's wall-clock time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        if self.capability.is_available() {
            BackendKind::Model
        } else {
            BackendKind::Heuristic
        }
    }

    #[instrument(skip_all, fields(goal_bytes = goal.len()))]
    pub fn run(&self, goal: &str, input: &LimitsInput) -> Result<AgentRun, AgentError> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(AgentError::InvalidInput("Goal is required".to_string()));
        }
        self.config.validate()?;

        let limits = self.config.limits.normalize(input);
        let started = Instant::now();
        let started_at = Utc::now();
        let control = RunControl {
            cancel: self.cancel.clone(),
            deadline: self.timeout.map(|t| started + t),
        };
        let run_id = format!(
            "run-{}-{}",
            started_at.timestamp_millis(),
            RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        let mut recorder = TraceRecorder::new(run_id.as_str(), self.config.message_limit_bytes);
        recorder.record(EntryKind::Goal, goal, 0);

        let command_model;
        let model_backend;
        let backend: &dyn ReasoningBackend = match &self.capability {
            ModelCapability::Available { credential } => {
                let model: &dyn ReasoningModel = match &self.model {
                    Some(model) => model.as_ref(),
                    None => {
                        command_model = CommandModel::new(&self.config.model, credential.as_str());
                        &command_model
                    }
                };
                model_backend = ModelBackend::new(model, &self.config.model, control.deadline)?;
                &model_backend
            }
            ModelCapability::Unavailable => &HeuristicBackend,
        };
        let kind = backend.kind();

        info!(
            run_id = %run_id,
            backend = kind.as_str(),
            max_depth = limits.max_depth,
            max_iterations = limits.max_iterations,
            "starting run"
        );
        recorder.record(
            EntryKind::Info,
            format!(
                "Using the {} backend with max depth {} and max iterations {}",
                kind.as_str(),
                limits.max_depth,
                limits.max_iterations
            ),
            0,
        );

        let outcome = Planner::new(
            backend,
            &mut recorder,
            &control,
            limits,
            self.config.max_subtasks,
        )
        .run(goal);

        let completed = outcome.stopped.is_none();
        recorder.record(
            EntryKind::Info,
            if completed {
                format!(
                    "Finished after {} iteration(s) across {} task(s)",
                    outcome.iterations, outcome.tasks_created
                )
            } else {
                format!(
                    "Returning a partial result after {} iteration(s)",
                    outcome.iterations
                )
            },
            0,
        );

        let steps = recorder.into_entries();
        check_invariants(&steps, &outcome, limits)?;

        let finished_at = Utc::now();
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            run_id = %run_id,
            iterations = outcome.iterations,
            depth_reached = outcome.depth_reached,
            completed,
            duration_ms,
            "run finished"
        );

        Ok(AgentRun {
            goal: goal.to_string(),
            steps,
            conclusion: outcome.conclusion,
            iterations: outcome.iterations,
            depth_reached: outcome.depth_reached,
            used_model: kind == BackendKind::Model,
            completed,
            metadata: RunMetadata {
                started_at: started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                finished_at: finished_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                duration_ms,
            },
        })
    }
}

fn check_invariants(
    steps: &[AgentLogEntry],
    outcome: &crate::planner::PlanOutcome,
    limits: Limits,
) -> Result<(), AgentError> {
    let totals = RunTotals {
        iterations: outcome.iterations,
        depth_reached: outcome.depth_reached,
    };
    let errors = validate_run(steps, totals, limits);
    if errors.is_empty() {
        return Ok(());
    }
    Err(AgentError::InternalFault(anyhow!(
        "run invariants violated: {}",
        errors.join("; ")
    )))
}

/// Run the agent once with a fresh orchestrator.
pub fn run_self_calling_agent(
    goal: &str,
    input: &LimitsInput,
    config: &AgentConfig,
    capability: ModelCapability,
) -> Result<AgentRun, AgentError> {
    Orchestrator::new(config.clone(), capability).run(goal, input)
}
