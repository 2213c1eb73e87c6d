//! Recursive planner: decides, decomposes or solves, and merges each task.
//!
//! Every task walks `Received -> Deciding -> {Decomposing | Solving} -> Merged`.
//! Recursion terminates because each child sits exactly one level deeper and
//! each entry consumes at least one iteration, and both are checked before any
//! work starts.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backend::{DecideRequest, ReasoningBackend, SynthesizeRequest};
use crate::core::budget::IterationBudget;
use crate::core::heuristic;
use crate::core::limits::Limits;
use crate::core::types::{Decision, EntryKind, Task};
use crate::trace::TraceRecorder;

/// Shared flag an external caller raises to stop a run early.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a run stopped before finishing its task tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => f.write_str("cancelled by caller"),
            StopReason::DeadlineExceeded => f.write_str("run deadline exceeded"),
        }
    }
}

/// External stop conditions, checked at every recursive entry and backend call.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub cancel: CancelFlag,
    pub deadline: Option<Instant>,
}

impl RunControl {
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StopReason::DeadlineExceeded),
            _ => None,
        }
    }
}

/// What the planner hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub conclusion: String,
    pub iterations: u32,
    pub depth_reached: u32,
    pub tasks_created: usize,
    pub stopped: Option<StopReason>,
}

pub struct Planner<'a> {
    backend: &'a dyn ReasoningBackend,
    recorder: &'a mut TraceRecorder,
    control: &'a RunControl,
    limits: Limits,
    max_subtasks: u32,
    budget: IterationBudget,
    goal: String,
    next_index: usize,
    depth_reached: u32,
    stopped: Option<StopReason>,
}

impl<'a> Planner<'a> {
    pub fn new(
        backend: &'a dyn ReasoningBackend,
        recorder: &'a mut TraceRecorder,
        control: &'a RunControl,
        limits: Limits,
        max_subtasks: u32,
    ) -> Self {
        Self {
            backend,
            recorder,
            control,
            limits,
            max_subtasks: max_subtasks.max(1),
            budget: IterationBudget::new(limits.max_iterations),
            goal: String::new(),
            next_index: 1,
            depth_reached: 0,
            stopped: None,
        }
    }

    /// Plan the root goal to completion (or until stopped).
    pub fn run(mut self, goal: &str) -> PlanOutcome {
        self.goal = goal.to_string();
        let root = Task::root(goal, self.budget.remaining());
        let conclusion = self.plan_task(&root);
        PlanOutcome {
            conclusion,
            iterations: self.budget.used(),
            depth_reached: self.depth_reached,
            tasks_created: self.next_index,
            stopped: self.stopped,
        }
    }

    fn plan_task(&mut self, task: &Task) -> String {
        // Received
        self.depth_reached = self.depth_reached.max(task.depth);
        if self.should_stop(task.depth) {
            return unfinished(task);
        }
        if !self.budget.try_consume() {
            self.recorder.record(
                EntryKind::Info,
                format!(
                    "Iteration budget exhausted before \"{}\" could be considered",
                    task.description
                ),
                task.depth,
            );
            return unfinished(task);
        }

        // Deciding
        let child_depth_fits = task.depth + 1 < self.limits.max_depth;
        let allow_decompose = child_depth_fits && !self.budget.is_exhausted();
        self.recorder.record(
            EntryKind::Thought,
            format!(
                "Considering \"{}\" at depth {} ({} iteration(s) left{})",
                task.description,
                task.depth,
                self.budget.remaining(),
                if allow_decompose {
                    ""
                } else {
                    ", must solve directly"
                }
            ),
            task.depth,
        );
        if self.should_stop(task.depth) {
            return unfinished(task);
        }

        let request = DecideRequest {
            goal: &self.goal,
            task,
            remaining: self.budget.remaining(),
            allow_decompose,
            max_subtasks: self.max_subtasks,
            max_depth: self.limits.max_depth,
        };
        match self.backend.decide(&request) {
            Ok(Decision::Solve { answer }) => self.solve(task, answer),
            Ok(Decision::Decompose { subtasks }) if allow_decompose => {
                self.decompose(task, subtasks)
            }
            Ok(Decision::Decompose { .. }) => {
                warn!(depth = task.depth, "backend ignored decomposition veto");
                self.recorder.record(
                    EntryKind::Error,
                    "Backend proposed a decomposition that depth or budget does not allow",
                    task.depth,
                );
                self.solve(task, heuristic::degraded_answer(&task.description))
            }
            Err(err) => {
                warn!(depth = task.depth, err = %err, "backend decide failed");
                self.recorder.record(
                    EntryKind::Error,
                    format!("Reasoning failed for \"{}\": {err}", task.description),
                    task.depth,
                );
                self.solve(task, heuristic::degraded_answer(&task.description))
            }
        }
    }

    fn solve(&mut self, task: &Task, answer: String) -> String {
        debug!(depth = task.depth, index = task.index, "solving directly");
        self.recorder.record(
            EntryKind::Action,
            format!("Solving \"{}\" directly", task.description),
            task.depth,
        );
        self.recorder
            .record(EntryKind::Result, answer.clone(), task.depth);
        answer
    }

    fn decompose(&mut self, task: &Task, mut subtasks: Vec<String>) -> String {
        let cap = self.max_subtasks.min(self.budget.remaining()) as usize;
        if subtasks.len() > cap {
            self.recorder.record(
                EntryKind::Info,
                format!(
                    "Keeping the first {cap} of {} subtasks to stay within limits",
                    subtasks.len()
                ),
                task.depth,
            );
            subtasks.truncate(cap);
        }

        let listing: Vec<String> = subtasks
            .iter()
            .enumerate()
            .map(|(idx, s)| format!("{}) {}", idx + 1, s))
            .collect();
        self.recorder.record(
            EntryKind::Action,
            format!(
                "Decomposing \"{}\" into {} subtask(s): {}",
                task.description,
                subtasks.len(),
                listing.join("; ")
            ),
            task.depth,
        );
        info!(
            depth = task.depth,
            subtasks = subtasks.len(),
            "decomposed task"
        );

        let total = subtasks.len();
        let mut child_results = Vec::with_capacity(total);
        for (pos, description) in subtasks.into_iter().enumerate() {
            if self.should_stop(task.depth) {
                break;
            }
            if self.budget.is_exhausted() {
                self.recorder.record(
                    EntryKind::Info,
                    format!(
                        "Skipping {} remaining subtask(s): iteration budget exhausted",
                        total - pos
                    ),
                    task.depth,
                );
                break;
            }
            let child = task.child(self.next_index, description, self.budget.remaining());
            self.next_index += 1;
            let result = self.plan_task(&child);
            self.recorder.record(
                EntryKind::Observation,
                format!(
                    "Subtask {}/{} \"{}\" returned: {}",
                    pos + 1,
                    total,
                    child.description,
                    first_line(&result)
                ),
                task.depth,
            );
            child_results.push(result);
        }

        self.merge(task, &child_results)
    }

    fn merge(&mut self, task: &Task, child_results: &[String]) -> String {
        let merged = if child_results.is_empty() {
            unfinished(task)
        } else if self.should_stop(task.depth) {
            heuristic::synthesize(&task.description, child_results)
        } else if !self.budget.try_consume() {
            self.recorder.record(
                EntryKind::Info,
                "No iterations left for synthesis; merging subtask results locally",
                task.depth,
            );
            heuristic::synthesize(&task.description, child_results)
        } else {
            let request = SynthesizeRequest {
                goal: &self.goal,
                task,
                child_results,
            };
            match self.backend.synthesize(&request) {
                Ok(summary) => summary,
                Err(err) => {
                    warn!(depth = task.depth, err = %err, "backend synthesize failed");
                    self.recorder.record(
                        EntryKind::Error,
                        format!("Synthesis failed for \"{}\": {err}", task.description),
                        task.depth,
                    );
                    heuristic::synthesize(&task.description, child_results)
                }
            }
        };
        self.recorder
            .record(EntryKind::Result, merged.clone(), task.depth);
        merged
    }

    /// Check external stop conditions, recording the first stop once.
    fn should_stop(&mut self, depth: u32) -> bool {
        if self.stopped.is_some() {
            return true;
        }
        let Some(reason) = self.control.stop_reason() else {
            return false;
        };
        warn!(%reason, depth, "run stopped early");
        self.stopped = Some(reason);
        self.recorder.record(
            EntryKind::Error,
            format!("Run stopped early: {reason}"),
            depth,
        );
        true
    }
}

fn unfinished(task: &Task) -> String {
    format!("\"{}\" was not completed.", task.description)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
