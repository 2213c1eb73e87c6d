//! Normalization of caller-supplied recursion limits.
//!
//! Callers hand over loosely typed numbers (the request layer coerces JSON into
//! `f64`). Invalid values are never rejected: absent or non-finite inputs take
//! the defaults, finite inputs are truncated and clamped into range.

use serde::{Deserialize, Serialize};

/// Raw limits as supplied by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsInput {
    pub max_depth: Option<f64>,
    pub max_iterations: Option<f64>,
}

impl LimitsInput {
    pub fn new(max_depth: Option<f64>, max_iterations: Option<f64>) -> Self {
        Self {
            max_depth,
            max_iterations,
        }
    }
}

/// Normalized limits for a single run. Both values are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub max_depth: u32,
    pub max_iterations: u32,
}

/// Defaults and ceilings applied during normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitPolicy {
    pub default_max_depth: u32,
    pub default_max_iterations: u32,
    /// Upper clamp for `max_depth`.
    pub max_depth_ceiling: u32,
    /// Upper clamp for `max_iterations`.
    pub max_iterations_ceiling: u32,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            default_max_depth: 3,
            default_max_iterations: 12,
            max_depth_ceiling: 6,
            max_iterations_ceiling: 32,
        }
    }
}

impl LimitPolicy {
    /// Returns a list of human-readable violations (empty when valid).
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_depth_ceiling == 0 {
            errors.push("max_depth_ceiling must be > 0".to_string());
        }
        if self.max_iterations_ceiling == 0 {
            errors.push("max_iterations_ceiling must be > 0".to_string());
        }
        if self.default_max_depth == 0 || self.default_max_depth > self.max_depth_ceiling {
            errors.push(format!(
                "default_max_depth must be in 1..={}",
                self.max_depth_ceiling
            ));
        }
        if self.default_max_iterations == 0
            || self.default_max_iterations > self.max_iterations_ceiling
        {
            errors.push(format!(
                "default_max_iterations must be in 1..={}",
                self.max_iterations_ceiling
            ));
        }
        errors
    }

    pub fn normalize(&self, input: &LimitsInput) -> Limits {
        Limits {
            max_depth: coerce(input.max_depth, self.default_max_depth, self.max_depth_ceiling),
            max_iterations: coerce(
                input.max_iterations,
                self.default_max_iterations,
                self.max_iterations_ceiling,
            ),
        }
    }
}

fn coerce(value: Option<f64>, default: u32, ceiling: u32) -> u32 {
    let ceiling = ceiling.max(1);
    match value {
        Some(raw) if raw.is_finite() => {
            let truncated = raw.trunc();
            if truncated < 1.0 {
                1
            } else if truncated >= f64::from(ceiling) {
                ceiling
            } else {
                truncated as u32
            }
        }
        _ => default.clamp(1, ceiling),
    }
}
