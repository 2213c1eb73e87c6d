//! I/O helpers for the agent: config files, prompts, and the model process.

pub mod config;
pub mod model;
pub mod process;
pub mod prompt;
