//! # strand-telemetry
//!
//! Telemetry sinks for the STRAND engine.
//!
//! ## Overview
//!
//! The executor reports start, stop, exception and compensate events
//! through the `TelemetrySink` trait. This crate provides:
//!
//! - `InMemoryTelemetry`: records every event, for tests and run reports
//! - `TracingTelemetry`: forwards events to `tracing`
//! - `FanoutTelemetry`: sends each event to several sinks
//! - `NullTelemetry`: drops everything
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strand_telemetry::{FanoutTelemetry, InMemoryTelemetry, TracingTelemetry};
//!
//! let recorder = InMemoryTelemetry::new();
//! let sink = FanoutTelemetry::new().with(recorder.clone()).with(TracingTelemetry);
//! let executor = Executor::new(Box::new(validator), Box::new(sink));
//! // ... run actions ...
//! println!("{} exceptions", recorder.count(EventKind::Exception));
//! ```

pub mod memory;
pub mod sink;

pub use memory::InMemoryTelemetry;
pub use sink::{FanoutTelemetry, NullTelemetry, TracingTelemetry};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use strand_contracts::telemetry::{EventKind, TelemetryEvent};
    use strand_core::traits::TelemetrySink;

    use super::{FanoutTelemetry, InMemoryTelemetry, NullTelemetry, TracingTelemetry};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn event(kind: EventKind, action: &str) -> TelemetryEvent {
        TelemetryEvent {
            kind,
            action: action.to_string(),
            attempt: 0,
            duration_ms: None,
            outcome: None,
            params: json!({ "amount": 1 }).as_object().cloned(),
            timestamp: Utc::now(),
        }
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_records_in_emission_order() {
        let recorder = InMemoryTelemetry::new();
        recorder.emit(&event(EventKind::Start, "increment"));
        recorder.emit(&event(EventKind::Stop, "increment"));

        let kinds: Vec<EventKind> = recorder.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Start, EventKind::Stop]);
    }

    /// Clones share one buffer.
    #[test]
    fn test_clones_share_events() {
        let recorder = InMemoryTelemetry::new();
        let handed_out = recorder.clone();
        handed_out.emit(&event(EventKind::Exception, "transfer"));

        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.count(EventKind::Exception), 1);
        assert_eq!(recorder.count(EventKind::Stop), 0);
    }

    #[test]
    fn test_filter_by_action_and_clear() {
        let recorder = InMemoryTelemetry::new();
        recorder.emit(&event(EventKind::Start, "a"));
        recorder.emit(&event(EventKind::Start, "b"));
        recorder.emit(&event(EventKind::Stop, "a"));

        assert_eq!(recorder.for_action("a").len(), 2);
        recorder.clear();
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = InMemoryTelemetry::new();
        let second = InMemoryTelemetry::new();
        let fanout = FanoutTelemetry::new()
            .with(first.clone())
            .with(second.clone())
            .with(TracingTelemetry)
            .with(NullTelemetry);

        fanout.emit(&event(EventKind::Compensate, "transfer"));

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
