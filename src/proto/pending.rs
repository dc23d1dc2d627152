//! Pending-subscriber buffer.
//!
//! Holds events for an interface that has opted into buffering but has no
//! handler yet. The dispatch table drains it once, in arrival order, when
//! the first handler registers, and never uses it again for that
//! interface.

use std::collections::VecDeque;

use super::codec::RawEvent;

/// Queue length above which the buffer starts warning.
pub const HIGH_WATER: usize = 64;

#[derive(Debug, Default)]
pub struct PendingSubscriberQueue {
    events: VecDeque<RawEvent>,
}

impl PendingSubscriberQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Returns `true` when the queue has just crossed
    /// [`HIGH_WATER`], so the caller can log once.
    pub fn push(&mut self, event: RawEvent) -> bool {
        self.events.push_back(event);
        self.events.len() == HIGH_WATER + 1
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consume the buffer, yielding events oldest first.
    pub fn into_events(self) -> impl Iterator<Item = RawEvent> {
        self.events.into_iter()
    }
}
