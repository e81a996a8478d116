//! In-memory implementation of `TelemetrySink`.
//!
//! `InMemoryTelemetry` keeps every event in a `Vec` behind a `Mutex`.
//! Clones share the same buffer, so a caller can hand one clone to the
//! executor and keep another to inspect what was recorded.

use std::sync::{Arc, Mutex, MutexGuard};

use strand_contracts::telemetry::{EventKind, TelemetryEvent};
use strand_core::traits::TelemetrySink;

/// An append-only recorder of engine events.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTelemetry {
    pub(crate) events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl InMemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every event recorded so far, in emission order.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.lock().clone()
    }

    /// Number of recorded events of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// Events emitted for the action named `action`.
    pub fn for_action(&self, action: &str) -> Vec<TelemetryEvent> {
        self.lock()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave a half-pushed event, so a
    // poisoned buffer is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<TelemetryEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TelemetrySink for InMemoryTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        self.lock().push(event.clone());
    }
}
