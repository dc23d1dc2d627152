//! In-process simulated coprocessor.
//!
//! Implements [`Transport`] with an event queue, a payload store keyed by
//! message id, and scripted replies per `(interface, function)`. Used by
//! the host tests and the `esp32-coproc-sim` demo.
//!
//! ```text
//!  test ─ raise_event ─▶ [queue] ─▶ read_event   (pump)
//!       └ set payload ─▶ [store] ─▶ fetch_payload (pump)
//!  on_command(reply) ─▶ control ─▶ status/result + follow-up events
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::error::QueueError;
use crate::proto::codec::{EVENT_RECORD_SIZE, EventHeader};
use crate::proto::transport::{RawCommand, RawPayloadRequest, Transport};
use crate::proto::types::{Interface, StatusCode};
use crate::sync::lock;

/// No such message id.
pub const ENOENT: i32 = -2;
/// Payload larger than the caller's buffer.
pub const EMSGSIZE: i32 = -90;

// ───────────────────────────────────────────────────────────────
// Script types
// ───────────────────────────────────────────────────────────────

/// Event raised by the simulator. A non-empty payload makes it complex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimEvent {
    pub interface: Interface,
    pub function: u32,
    pub status: StatusCode,
    pub payload: Vec<u8>,
}

impl SimEvent {
    pub fn new(interface: Interface, function: u32, status: StatusCode) -> Self {
        Self {
            interface,
            function,
            status,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}

/// Scripted answer to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Native return code; nonzero simulates a transport failure.
    pub rc: i32,
    pub status: StatusCode,
    pub result: Vec<u8>,
    /// Events queued once the command has been answered.
    pub then: Vec<SimEvent>,
}

impl Reply {
    pub fn status(status: StatusCode) -> Self {
        Self {
            rc: 0,
            status,
            result: Vec::new(),
            then: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::status(StatusCode::CompletedOk)
    }

    pub fn transport_error(rc: i32) -> Self {
        Self {
            rc,
            ..Self::ok()
        }
    }

    pub fn with_result(mut self, result: Vec<u8>) -> Self {
        self.result = result;
        self
    }

    pub fn then(mut self, event: SimEvent) -> Self {
        self.then.push(event);
        self
    }
}

/// A command as the simulator saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub interface: u8,
    pub function: u32,
    pub blocking: bool,
    pub payload: Vec<u8>,
    pub result_capacity: usize,
}

// ───────────────────────────────────────────────────────────────
// Simulator
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Queue {
    records: VecDeque<[u8; EVENT_RECORD_SIZE]>,
    interrupts: usize,
    fatal: Option<QueueError>,
    closed: bool,
}

pub struct SimCoprocessor {
    queue: Mutex<Queue>,
    readable: Condvar,
    payloads: Mutex<HashMap<u32, Vec<u8>>>,
    next_message_id: AtomicU32,
    replies: Mutex<HashMap<(u8, u32), Reply>>,
    commands: Mutex<Vec<CommandRecord>>,
    fetches: AtomicUsize,
}

impl SimCoprocessor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(Queue::default()),
            readable: Condvar::new(),
            payloads: Mutex::new(HashMap::new()),
            next_message_id: AtomicU32::new(1),
            replies: Mutex::new(HashMap::new()),
            commands: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        })
    }

    /// Script the reply for `(interface, function)`. Unscripted commands
    /// complete with `CompletedOk` and no result.
    pub fn on_command(&self, interface: Interface, function: u32, reply: Reply) {
        lock(&self.replies).insert((interface.code(), function), reply);
    }

    /// Queue an event. A payload is stored under a fresh message id.
    pub fn raise(&self, event: SimEvent) {
        let message_id = if event.payload.is_empty() {
            0
        } else {
            let id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
            self.set_payload(id, event.payload);
            id
        };
        self.push_record(
            EventHeader {
                interface: event.interface.code(),
                function: event.function,
                status: event.status,
                message_id,
            }
            .to_record(),
        );
    }

    pub fn raise_simple(&self, interface: Interface, function: u32, status: StatusCode) {
        self.raise(SimEvent::new(interface, function, status));
    }

    /// Queue a raw 22-byte record as-is.
    pub fn push_record(&self, record: [u8; EVENT_RECORD_SIZE]) {
        lock(&self.queue).records.push_back(record);
        self.readable.notify_all();
    }

    pub fn set_payload(&self, message_id: u32, payload: Vec<u8>) {
        lock(&self.payloads).insert(message_id, payload);
    }

    /// The next `n` reads fail with EINTR.
    pub fn interrupt_next_reads(&self, n: usize) {
        lock(&self.queue).interrupts += n;
        self.readable.notify_all();
    }

    /// The next read fails with `errno`.
    pub fn fail_reads(&self, errno: i32) {
        lock(&self.queue).fatal = Some(QueueError::Os(errno));
        self.readable.notify_all();
    }

    /// Reads report `Closed` once the queue is drained.
    pub fn close(&self) {
        lock(&self.queue).closed = true;
        self.readable.notify_all();
    }

    pub fn commands(&self) -> Vec<CommandRecord> {
        lock(&self.commands).clone()
    }

    /// Commands issued to one interface/function.
    pub fn commands_for(&self, interface: Interface, function: u32) -> Vec<CommandRecord> {
        lock(&self.commands)
            .iter()
            .filter(|c| c.interface == interface.code() && c.function == function)
            .cloned()
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn queued(&self) -> usize {
        lock(&self.queue).records.len()
    }
}

impl Transport for SimCoprocessor {
    fn control(&self, cmd: &mut RawCommand<'_>) -> i32 {
        lock(&self.commands).push(CommandRecord {
            interface: cmd.interface(),
            function: cmd.function(),
            blocking: cmd.blocking(),
            payload: cmd.payload().to_vec(),
            result_capacity: cmd.result_len() as usize,
        });

        let reply = lock(&self.replies)
            .get(&(cmd.interface(), cmd.function()))
            .cloned()
            .unwrap_or_else(Reply::ok);
        if reply.rc != 0 {
            return reply.rc;
        }

        if let Some(out) = cmd.result_mut() {
            let n = reply.result.len().min(out.len());
            out[..n].copy_from_slice(&reply.result[..n]);
            cmd.set_result_written(n);
        }
        cmd.set_status(reply.status.code());

        for event in reply.then {
            self.raise(event);
        }
        0
    }

    fn fetch_payload(&self, req: &mut RawPayloadRequest<'_>) -> i32 {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let Some(payload) = lock(&self.payloads).remove(&req.message_id()) else {
            return ENOENT;
        };
        if payload.len() > req.capacity() {
            return EMSGSIZE;
        }
        req.buffer_mut()[..payload.len()].copy_from_slice(&payload);
        req.set_written(payload.len());
        0
    }

    fn read_event(&self, record: &mut [u8; EVENT_RECORD_SIZE]) -> Result<(), QueueError> {
        let mut q = lock(&self.queue);
        loop {
            if q.interrupts > 0 {
                q.interrupts -= 1;
                return Err(QueueError::Interrupted);
            }
            if let Some(err) = q.fatal.take() {
                return Err(err);
            }
            if let Some(next) = q.records.pop_front() {
                *record = next;
                return Ok(());
            }
            if q.closed {
                return Err(QueueError::Closed);
            }
            q = self
                .readable
                .wait(q)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
