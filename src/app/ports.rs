//! Port traits — the boundary between the adapters and the application.
//!
//! ```text
//!   coprocessor event ─▶ adapter handler ─▶ NetworkEventSink ─▶ application
//! ```
//!
//! Sinks are shared by the per-interface dispatch lanes, so `emit` takes
//! `&self` and may be called from several threads at once.

use std::sync::Mutex;

use super::events::NetworkEvent;

// ───────────────────────────────────────────────────────────────
// Event sink port (adapters → application)
// ───────────────────────────────────────────────────────────────

pub trait NetworkEventSink: Send + Sync {
    fn emit(&self, event: &NetworkEvent);
}

/// Discards everything.
pub struct NullSink;

impl NetworkEventSink for NullSink {
    fn emit(&self, _event: &NetworkEvent) {}
}

/// Records every event in arrival order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NetworkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NetworkEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl NetworkEventSink for RecordingSink {
    fn emit(&self, event: &NetworkEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
