//! Deterministic, pure logic shared by the agent core.
//!
//! Core modules are free of I/O side effects. They operate on in-memory data
//! and return deterministic outputs suitable for tests.

pub mod budget;
pub mod heuristic;
pub mod invariants;
pub mod limits;
pub mod types;
