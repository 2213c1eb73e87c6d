//! Iteration and wall-clock budget helpers for deterministic orchestration.

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

/// Counter of reasoning units consumed by a run.
///
/// The counter never decreases and never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationBudget {
    max: u32,
    used: u32,
}

impl IterationBudget {
    pub fn new(max: u32) -> Self {
        Self { max, used: 0 }
    }

    /// Consume one unit. Returns `false` (and consumes nothing) when exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.max {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.max - self.used
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

/// Return the remaining time budget until the provided deadline.
pub fn remaining_budget(deadline: Instant) -> Result<Duration> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .unwrap_or(Duration::from_secs(0));
    if remaining.is_zero() {
        return Err(anyhow!("run deadline exceeded"));
    }
    Ok(remaining)
}

/// Clamp a per-call timeout so it never outlives an optional run deadline.
pub fn call_timeout(configured: Duration, deadline: Option<Instant>) -> Result<Duration> {
    match deadline {
        Some(deadline) => Ok(configured.min(remaining_budget(deadline)?)),
        None => Ok(configured),
    }
}
