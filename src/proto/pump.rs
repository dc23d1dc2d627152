//! Event pump — the single background reader of the coprocessor event
//! queue.
//!
//! ```text
//!  read_event ─▶ EventHeader::parse ─▶ message_id == 0 ? ─▶ Dispatcher::dispatch_from
//!      │ EINTR: retry        │ malformed: drop       │ no: fetch_payload
//!      │ other: fatal ───────┴───────────────────────┴─▶ System/PumpFailed, exit
//! ```
//!
//! Started once and never restarted. Records are handed to the dispatcher
//! in the order they were read; the pump never waits for a handler.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use serde::Serialize;

use crate::error::QueueError;
use crate::logging::Logger;
use crate::{log_debug, log_error, log_info, log_trace, log_warn};

use super::channel::CommandChannel;
use super::codec::{EVENT_RECORD_SIZE, EventHeader, RawEvent, WireRecord};
use super::dispatch::Dispatcher;
use super::messages::ErrorEventData;
use super::transport::Transport;
use super::types::{Interface, StatusCode, SystemFunction};

const PUMP_THREAD: &str = "coproc-events";
const PUMP_STACK_KB: usize = 64;

// ───────────────────────────────────────────────────────────────
// Statistics
// ───────────────────────────────────────────────────────────────

/// Counters updated by the pump thread, readable from anywhere.
#[derive(Debug, Default)]
pub struct PumpStats {
    records: AtomicU64,
    simple: AtomicU64,
    complex: AtomicU64,
    fetch_failures: AtomicU64,
    malformed: AtomicU64,
    unknown_interface: AtomicU64,
    interrupted: AtomicU64,
}

/// Point-in-time copy of [`PumpStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpStatsSnapshot {
    pub records: u64,
    pub simple: u64,
    pub complex: u64,
    pub fetch_failures: u64,
    pub malformed: u64,
    pub unknown_interface: u64,
    pub interrupted: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl PumpStats {
    pub fn snapshot(&self) -> PumpStatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PumpStatsSnapshot {
            records: get(&self.records),
            simple: get(&self.simple),
            complex: get(&self.complex),
            fetch_failures: get(&self.fetch_failures),
            malformed: get(&self.malformed),
            unknown_interface: get(&self.unknown_interface),
            interrupted: get(&self.interrupted),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Worker
// ───────────────────────────────────────────────────────────────

struct PumpWorker {
    transport: Arc<dyn Transport>,
    channel: Arc<CommandChannel>,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<PumpStats>,
    log: Logger,
}

impl PumpWorker {
    fn run(&self) {
        log_info!(self.log, "event pump started");
        let mut record = [0u8; EVENT_RECORD_SIZE];
        let err = loop {
            if let ControlFlow::Break(err) = self.step(&mut record) {
                break err;
            }
        };
        log_error!(self.log, "event queue read failed ({}); event pump stopping", err);
        self.report_fatal(err);
    }

    /// Process one queue record. Breaks only on a fatal queue error.
    fn step(&self, record: &mut [u8; EVENT_RECORD_SIZE]) -> ControlFlow<QueueError> {
        match self.transport.read_event(record) {
            Ok(()) => {}
            Err(QueueError::Interrupted) => {
                bump(&self.stats.interrupted);
                return ControlFlow::Continue(());
            }
            Err(e) => return ControlFlow::Break(e),
        }
        bump(&self.stats.records);

        let header = match EventHeader::parse(record) {
            Ok(h) => h,
            Err(e) => {
                bump(&self.stats.malformed);
                log_warn!(self.log, "dropping malformed event record: {}", e);
                return ControlFlow::Continue(());
            }
        };

        let payload = if header.is_simple() {
            bump(&self.stats.simple);
            Vec::new()
        } else {
            bump(&self.stats.complex);
            match self.channel.fetch_payload(header.message_id) {
                Ok(p) => p,
                Err(e) => {
                    bump(&self.stats.fetch_failures);
                    log_warn!(
                        self.log,
                        "payload for message {} unavailable ({}); dispatching without it",
                        header.message_id,
                        e
                    );
                    Vec::new()
                }
            }
        };

        log_trace!(
            self.log,
            "event if={} fn={:#x} status={} id={} ({} bytes)",
            header.interface,
            header.function,
            header.status,
            header.message_id,
            payload.len()
        );
        if !self.dispatcher.dispatch_from(&header, payload) {
            bump(&self.stats.unknown_interface);
        }
        ControlFlow::Continue(())
    }

    fn report_fatal(&self, err: QueueError) {
        let code = match err {
            QueueError::Os(errno) => errno as u32,
            QueueError::Interrupted | QueueError::Closed => 0,
        };
        let data = ErrorEventData {
            code,
            message: err.to_string(),
        };
        let payload = data.to_vec().unwrap_or_default();
        self.dispatcher.dispatch(RawEvent::new(
            Interface::System,
            SystemFunction::PumpFailed.code(),
            StatusCode::Failure,
            payload,
        ));
    }
}

// ───────────────────────────────────────────────────────────────
// Handle
// ───────────────────────────────────────────────────────────────

/// Handle to the running pump thread.
pub struct EventPump {
    stats: Arc<PumpStats>,
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl EventPump {
    pub fn spawn(
        transport: Arc<dyn Transport>,
        channel: Arc<CommandChannel>,
        dispatcher: Arc<Dispatcher>,
        log: Logger,
    ) -> std::io::Result<Self> {
        let stats = Arc::new(PumpStats::default());
        let running = Arc::new(AtomicBool::new(true));
        let worker = PumpWorker {
            transport,
            channel,
            dispatcher,
            stats: stats.clone(),
            log,
        };
        let flag = running.clone();
        let thread = std::thread::Builder::new()
            .name(PUMP_THREAD.into())
            .stack_size(PUMP_STACK_KB * 1024)
            .spawn(move || {
                worker.run();
                flag.store(false, Ordering::Release);
                log_debug!(worker.log, "event pump exited");
            })?;
        Ok(Self {
            stats,
            running,
            thread,
        })
    }

    pub fn stats(&self) -> PumpStatsSnapshot {
        self.stats.snapshot()
    }

    /// `false` once the pump has hit a fatal queue error.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Wait for the pump to exit. Only returns after a fatal queue error.
    pub fn join(self) -> PumpStatsSnapshot {
        let _ = self.thread.join();
        self.stats.snapshot()
    }
}
