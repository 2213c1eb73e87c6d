//! Post-run invariants that must hold for every assembled run.

use std::collections::HashSet;

use crate::core::limits::Limits;
use crate::core::types::{AgentLogEntry, EntryKind};

/// Summary numbers checked alongside the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTotals {
    pub iterations: u32,
    pub depth_reached: u32,
}

/// Check invariants of a finished run:
/// - the trace opens with a `goal` entry at depth 0
/// - ids are unique
/// - timestamps never decrease
/// - entry depths stay within `0..=depth_reached`
/// - `depth_reached < max_depth` and `iterations <= max_iterations`
pub fn validate_run(steps: &[AgentLogEntry], totals: RunTotals, limits: Limits) -> Vec<String> {
    let mut errors = Vec::new();

    match steps.first() {
        Some(first) if first.kind == EntryKind::Goal && first.depth == 0 => {}
        _ => errors.push("trace must open with a goal entry at depth 0".to_string()),
    }

    let mut seen = HashSet::new();
    for entry in steps {
        if !seen.insert(entry.id.as_str()) {
            errors.push(format!("duplicate entry id '{}'", entry.id));
        }
        if entry.depth > totals.depth_reached {
            errors.push(format!(
                "{}: depth {} exceeds depth reached {}",
                entry.id, entry.depth, totals.depth_reached
            ));
        }
    }

    for pair in steps.windows(2) {
        if pair[1].timestamp < pair[0].timestamp {
            errors.push(format!(
                "{}: timestamp goes backwards from {}",
                pair[1].id, pair[0].id
            ));
        }
    }

    if totals.depth_reached >= limits.max_depth {
        errors.push(format!(
            "depth reached {} is not below max depth {}",
            totals.depth_reached, limits.max_depth
        ));
    }
    if totals.iterations > limits.max_iterations {
        errors.push(format!(
            "iterations {} exceed max iterations {}",
            totals.iterations, limits.max_iterations
        ));
    }

    errors
}
