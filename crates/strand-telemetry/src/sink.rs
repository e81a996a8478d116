//! Forwarding sinks.

use tracing::{debug, info, warn};

use strand_contracts::telemetry::{EventKind, TelemetryEvent};
use strand_core::traits::TelemetrySink;

/// Forwards engine events to `tracing`.
///
/// Starts and stops are logged at `debug`, exceptions at `warn`,
/// compensations at `info`. Params are serialized only when the event
/// carries them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        let params = event
            .params
            .as_ref()
            .map(|p| serde_json::Value::Object(p.clone()).to_string())
            .unwrap_or_default();
        let outcome = event.outcome.as_deref().unwrap_or("");
        let duration_ms = event.duration_ms.unwrap_or(0);

        match event.kind {
            EventKind::Start => debug!(
                action = %event.action,
                attempt = event.attempt,
                %params,
                "action start"
            ),
            EventKind::Stop => debug!(
                action = %event.action,
                attempt = event.attempt,
                duration_ms,
                %outcome,
                "action stop"
            ),
            EventKind::Exception => warn!(
                action = %event.action,
                attempt = event.attempt,
                duration_ms,
                %outcome,
                "action exception"
            ),
            EventKind::Compensate => info!(
                action = %event.action,
                %outcome,
                "action compensate"
            ),
        }
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn emit(&self, _event: &TelemetryEvent) {}
}

/// Sends every event to each inner sink in turn.
#[derive(Default)]
pub struct FanoutTelemetry {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl FanoutTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl TelemetrySink for FanoutTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
