//! Instrumentation event types.
//!
//! The engine wraps every action attempt in a start event and a matching
//! stop or exception event. Sinks consume these for logs, metrics or test
//! assertions; nothing in the engine reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::Params;

/// Which edge of an attempt an event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Stop,
    Exception,
    /// Compensation was invoked after a final failure.
    Compensate,
}

/// One instrumentation event around an action attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub kind: EventKind,
    /// Name of the action being executed.
    pub action: String,
    /// 0 for the first attempt, incremented per retry.
    pub attempt: u32,
    /// Wall-clock duration of the attempt. Absent on start events.
    pub duration_ms: Option<u64>,
    /// `"ok"` or the error kind (e.g. `"timeout"`). Absent on start events.
    pub outcome: Option<String>,
    /// Params, only at `TelemetryLevel::Full`.
    pub params: Option<Params>,
    pub timestamp: DateTime<Utc>,
}
