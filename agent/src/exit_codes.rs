//! Stable exit codes for agent CLI commands.

/// Run completed and the result was written.
pub const OK: i32 = 0;
/// Caller input was rejected (empty goal, malformed request).
pub const INVALID: i32 = 1;
/// The run failed internally.
pub const FAULT: i32 = 2;
