//! Interface dispatch table.
//!
//! One lane per interface. Each lane is a bounded `embassy-sync` channel
//! feeding a dedicated worker thread, so handlers for different
//! interfaces run concurrently while events of a single interface are
//! delivered strictly in the order the pump handed them over.
//!
//! ```text
//!                 ┌─ lane[wifi]     ──▶ worker ──▶ WifiAdapter
//!  EventPump ──▶──┼─ lane[ethernet] ──▶ worker ──▶ (pending buffer) ─▶ EthernetAdapter
//!                 ├─ lane[system]   ──▶ worker ──▶ SystemMonitor
//!                 └─ ...                         (no handler: log + drop)
//! ```
//!
//! The pump never waits for a handler. It only blocks when a lane's
//! channel is full, which applies back-pressure instead of dropping.

use core::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::logging::Logger;
use crate::sync::lock;
use crate::{log_debug, log_error, log_info, log_trace, log_warn};

use super::codec::{EventHeader, RawEvent};
use super::pending::PendingSubscriberQueue;
use super::types::Interface;

/// Events that can sit in one lane before the pump blocks.
pub const LANE_DEPTH: usize = 32;

const LANE_STACK_KB: usize = 64;

// ───────────────────────────────────────────────────────────────
// Handler trait
// ───────────────────────────────────────────────────────────────

/// Consumer of one interface's events. Called serially, never
/// concurrently with itself.
pub trait EventHandler: Send + 'static {
    fn on_event(&mut self, event: &RawEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&RawEvent) + Send + 'static,
{
    fn on_event(&mut self, event: &RawEvent) {
        self(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// A handler is already attached to this interface.
    AlreadyRegistered(Interface),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered(iface) => write!(f, "{iface} already has a handler"),
        }
    }
}

impl std::error::Error for DispatchError {}

// ───────────────────────────────────────────────────────────────
// Lanes
// ───────────────────────────────────────────────────────────────

enum LaneMsg {
    Event(RawEvent),
    Shutdown,
}

type LaneQueue = Channel<CriticalSectionRawMutex, LaneMsg, LANE_DEPTH>;

#[derive(Default)]
struct LaneState {
    handler: Option<Box<dyn EventHandler>>,
    /// `Some` only for buffering interfaces that have not subscribed yet.
    pending: Option<PendingSubscriberQueue>,
}

struct Lane {
    interface: Interface,
    queue: Arc<LaneQueue>,
    state: Arc<Mutex<LaneState>>,
    _worker: JoinHandle<()>,
}

fn invoke(handler: &mut Box<dyn EventHandler>, event: &RawEvent, log: &Logger) {
    if catch_unwind(AssertUnwindSafe(|| handler.on_event(event))).is_err() {
        log_error!(
            log,
            "{} handler panicked on fn {:#x}; event discarded",
            event.interface,
            event.function
        );
    }
}

fn deliver(interface: Interface, state: &Mutex<LaneState>, event: RawEvent, log: &Logger) {
    let mut st = lock(state);
    let LaneState { handler, pending } = &mut *st;
    if let Some(handler) = handler {
        log_trace!(log, "{}: delivering fn {:#x}", interface, event.function);
        invoke(handler, &event, log);
    } else if let Some(pending) = pending {
        if pending.push(event) {
            log_warn!(log, "{}: {} events waiting for a subscriber", interface, pending.len());
        }
    } else {
        log_debug!(
            log,
            "{}: no handler, dropping fn {:#x} ({})",
            interface,
            event.function,
            event.status
        );
    }
}

fn spawn_lane(
    interface: Interface,
    queue: Arc<LaneQueue>,
    state: Arc<Mutex<LaneState>>,
    log: Logger,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("coproc-{interface}"))
        .stack_size(LANE_STACK_KB * 1024)
        .spawn(move || {
            futures_lite::future::block_on(async {
                loop {
                    match queue.receive().await {
                        LaneMsg::Event(event) => deliver(interface, &state, event, &log),
                        LaneMsg::Shutdown => break,
                    }
                }
            });
            log_debug!(log, "{} lane stopped", interface);
        })
}

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

pub struct Dispatcher {
    lanes: Vec<Lane>,
    log: Logger,
}

impl Dispatcher {
    /// Build the table and start one worker per interface. Interfaces in
    /// `buffered` retain events until their first handler registers.
    pub fn new(buffered: &[Interface], log: Logger) -> std::io::Result<Self> {
        let mut lanes = Vec::with_capacity(Interface::COUNT);
        for interface in Interface::ALL {
            let queue = Arc::new(LaneQueue::new());
            let state = Arc::new(Mutex::new(LaneState {
                handler: None,
                pending: buffered
                    .contains(&interface)
                    .then(PendingSubscriberQueue::new),
            }));
            let worker = spawn_lane(interface, queue.clone(), state.clone(), log)?;
            lanes.push(Lane {
                interface,
                queue,
                state,
                _worker: worker,
            });
        }
        Ok(Self { lanes, log })
    }

    fn lane(&self, interface: Interface) -> &Lane {
        &self.lanes[interface.index()]
    }

    /// Attach the handler for `interface`.
    ///
    /// Buffered events are replayed into it, oldest first, before this
    /// returns; from then on events go straight to the handler. Returns
    /// the number of replayed events.
    pub fn register(
        &self,
        interface: Interface,
        handler: impl EventHandler,
    ) -> Result<usize, DispatchError> {
        let lane = self.lane(interface);
        let mut st = lock(&lane.state);
        if st.handler.is_some() {
            return Err(DispatchError::AlreadyRegistered(interface));
        }

        let mut handler: Box<dyn EventHandler> = Box::new(handler);
        let mut replayed = 0;
        if let Some(pending) = st.pending.take() {
            for event in pending.into_events() {
                invoke(&mut handler, &event, &self.log);
                replayed += 1;
            }
        }
        st.handler = Some(handler);

        log_info!(
            self.log,
            "{}: handler registered ({} buffered events replayed)",
            lane.interface,
            replayed
        );
        Ok(replayed)
    }

    /// Hand an event to its lane without waiting for delivery.
    pub fn dispatch(&self, event: RawEvent) {
        let lane = self.lane(event.interface);
        match lane.queue.try_send(LaneMsg::Event(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                log_debug!(self.log, "{} lane full, waiting", lane.interface);
                futures_lite::future::block_on(lane.queue.send(msg));
            }
        }
    }

    /// Route by raw header. Unknown interface codes are logged and
    /// dropped; returns whether the event was queued.
    pub fn dispatch_from(&self, header: &EventHeader, payload: Vec<u8>) -> bool {
        let Some(interface) = header.interface() else {
            log_warn!(
                self.log,
                "dropping event for unknown interface {} (fn {:#x})",
                header.interface,
                header.function
            );
            return false;
        };
        self.dispatch(RawEvent::new(interface, header.function, header.status, payload));
        true
    }

    pub fn has_handler(&self, interface: Interface) -> bool {
        lock(&self.lane(interface).state).handler.is_some()
    }

    /// Events currently buffered for `interface`.
    pub fn pending_len(&self, interface: Interface) -> usize {
        lock(&self.lane(interface).state)
            .pending
            .as_ref()
            .map_or(0, PendingSubscriberQueue::len)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        for lane in &self.lanes {
            futures_lite::future::block_on(lane.queue.send(LaneMsg::Shutdown));
        }
    }
}
