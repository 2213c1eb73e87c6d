//! Append-only trace of a run's reasoning steps.
//!
//! One recorder belongs to exactly one run. Entries come back in the order
//! they were recorded and are never removed or reordered.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::trace;

use crate::core::types::{AgentLogEntry, EntryKind};

const TRUNCATION_MARKER: &str = " [truncated]";

#[derive(Debug)]
pub struct TraceRecorder {
    run_id: String,
    message_limit_bytes: usize,
    entries: Vec<AgentLogEntry>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl TraceRecorder {
    pub fn new(run_id: impl Into<String>, message_limit_bytes: usize) -> Self {
        Self {
            run_id: run_id.into(),
            message_limit_bytes,
            entries: Vec::new(),
            last_timestamp: None,
        }
    }

    /// Append an entry and return a copy of it.
    ///
    /// Timestamps never go backwards even if the wall clock does.
    pub fn record(
        &mut self,
        kind: EntryKind,
        message: impl Into<String>,
        depth: u32,
    ) -> AgentLogEntry {
        let now = Utc::now();
        let stamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(stamp);

        let entry = AgentLogEntry {
            id: format!("{}-{}", self.run_id, self.entries.len()),
            kind,
            message: truncate_message(message.into(), self.message_limit_bytes),
            depth,
            timestamp: stamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        trace!(id = %entry.id, kind = kind.as_str(), depth, "trace entry");
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[AgentLogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<AgentLogEntry> {
        self.entries
    }
}

fn truncate_message(mut message: String, limit: usize) -> String {
    if message.len() <= limit {
        return message;
    }
    let mut cut = limit.saturating_sub(TRUNCATION_MARKER.len());
    while cut > 0 && !message.is_char_boundary(cut) {
        cut -= 1;
    }
    message.truncate(cut);
    message.push_str(TRUNCATION_MARKER);
    message
}
