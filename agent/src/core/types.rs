//! Shared deterministic types for the planning core.
//!
//! These types define stable contracts between the planner, the reasoning
//! backends, and the trace recorder. They do not depend on external state.

use serde::{Deserialize, Serialize};

/// A node in the recursion tree.
///
/// Tasks are never mutated after creation. Decomposition produces new child
/// tasks that point back at their parent by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Position of this task in creation order (root is 0).
    pub index: usize,
    pub description: String,
    /// Decomposition levels from the root (root is 0).
    pub depth: u32,
    /// Index of the parent task, `None` for the root.
    pub parent: Option<usize>,
    /// Iteration units left when this task was created.
    pub budget_snapshot: u32,
}

impl Task {
    pub fn root(description: impl Into<String>, budget_snapshot: u32) -> Self {
        Self {
            index: 0,
            description: description.into(),
            depth: 0,
            parent: None,
            budget_snapshot,
        }
    }

    /// Create a child one level below `self`.
    pub fn child(&self, index: usize, description: impl Into<String>, budget: u32) -> Self {
        Self {
            index,
            description: description.into(),
            depth: self.depth + 1,
            parent: Some(self.index),
            budget_snapshot: budget,
        }
    }
}

/// Outcome of a decide call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    /// Split the task into ordered subtasks.
    Decompose { subtasks: Vec<String> },
    /// Answer the task directly.
    Solve { answer: String },
}

/// Kind of a trace entry. Serialized as the `type` field of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Goal,
    Thought,
    Action,
    Observation,
    Result,
    Info,
    Error,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Goal => "goal",
            EntryKind::Thought => "thought",
            EntryKind::Action => "action",
            EntryKind::Observation => "observation",
            EntryKind::Result => "result",
            EntryKind::Info => "info",
            EntryKind::Error => "error",
        }
    }
}

/// One immutable record in a run's trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub message: String,
    pub depth: u32,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_points_back_at_parent() {
        let root = Task::root("goal", 8);
        let child = root.child(3, "sub", 5);
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent, Some(0));
        assert_eq!(child.index, 3);
        assert_eq!(child.budget_snapshot, 5);
        assert_eq!(root.description, "goal");
    }

    #[test]
    fn entry_serializes_kind_as_type() {
        let entry = AgentLogEntry {
            id: "run-1-0".to_string(),
            kind: EntryKind::Observation,
            message: "done".to_string(),
            depth: 2,
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["type"], "observation");
        assert_eq!(value["depth"], 2);
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn decision_parses_tagged_json() {
        let raw = r#"{"decision":"decompose","subtasks":["a","b"]}"#;
        let decision: Decision = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            decision,
            Decision::Decompose {
                subtasks: vec!["a".to_string(), "b".to_string()]
            }
        );
    }
}
