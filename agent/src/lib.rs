//! Self-calling agent: recursively decomposes a goal into subtasks under hard
//! depth and iteration limits and records every reasoning step.
//!
//! The crate keeps the usual split:
//!
//! - **[`core`]**: Pure, deterministic logic (limits, budgets, the heuristic
//!   reasoner, run invariants). No I/O.
//! - **[`io`]**: Side-effecting operations (config files, prompt rendering,
//!   spawning the model command).
//!
//! [`planner`] drives the recursion against a [`backend::ReasoningBackend`],
//! [`run`] assembles a complete [`run::AgentRun`], and [`request`] maps the
//! JSON request envelope onto it.

pub mod backend;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod planner;
pub mod request;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod trace;

pub use crate::core::limits::LimitsInput;
pub use crate::error::{AgentError, BackendError};
pub use crate::io::config::AgentConfig;
pub use crate::io::model::ModelCapability;
pub use crate::planner::CancelFlag;
pub use crate::run::{AgentRun, Orchestrator, run_self_calling_agent};
