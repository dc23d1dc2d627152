//! Transport abstraction — the native control calls and the event queue.
//!
//! Concrete implementations:
//! - `ioctl` on the coprocessor character device + POSIX message queue
//!   ([`crate::adapters::posix`], `posix` feature)
//! - in-process simulated coprocessor ([`crate::adapters::sim`])
//!
//! The command structures are `#[repr(C)]` so a native implementation can
//! hand them straight to the driver. Their buffers are *borrowed*: a
//! [`RawCommand<'a>`] cannot outlive the slices it points into, so the
//! addresses stay fixed for the whole native call and are released on
//! every exit path when the borrow ends.

use core::marker::PhantomData;
use core::ptr;

use crate::error::QueueError;

use super::codec::EVENT_RECORD_SIZE;

/// Byte channel to the coprocessor.
///
/// Shared between caller threads and the event pump, hence `&self`.
pub trait Transport: Send + Sync {
    /// Execute one command. Returns 0 on success, a raw platform error
    /// code otherwise. On success the implementation sets the status and,
    /// when a result buffer is attached, shrinks `result_len` to the
    /// number of bytes written.
    fn control(&self, cmd: &mut RawCommand<'_>) -> i32;

    /// Fetch the payload of a complex event. Same return convention;
    /// `payload_len` is shrunk to the bytes written.
    fn fetch_payload(&self, req: &mut RawPayloadRequest<'_>) -> i32;

    /// Block until one event record is available.
    fn read_event(&self, record: &mut [u8; EVENT_RECORD_SIZE]) -> Result<(), QueueError>;
}

// ───────────────────────────────────────────────────────────────
// Command block
// ───────────────────────────────────────────────────────────────

/// Native command block.
#[repr(C)]
pub struct RawCommand<'a> {
    interface: u8,
    function: u32,
    status: u32,
    payload_ptr: *const u8,
    payload_len: u32,
    result_ptr: *mut u8,
    result_len: u32,
    blocking: u8,
    _buffers: PhantomData<&'a mut [u8]>,
}

impl<'a> RawCommand<'a> {
    /// Build a command block. A result buffer is only attached when it is
    /// non-empty *and* the call is blocking.
    pub fn new(
        interface: u8,
        function: u32,
        blocking: bool,
        payload: Option<&'a [u8]>,
        result: Option<&'a mut [u8]>,
    ) -> Self {
        let (payload_ptr, payload_len) = match payload {
            Some(p) if !p.is_empty() => (p.as_ptr(), p.len() as u32),
            _ => (ptr::null(), 0),
        };
        let (result_ptr, result_len) = match result {
            Some(r) if blocking && !r.is_empty() => (r.as_mut_ptr(), r.len() as u32),
            _ => (ptr::null_mut(), 0),
        };
        Self {
            interface,
            function,
            status: 0,
            payload_ptr,
            payload_len,
            result_ptr,
            result_len,
            blocking: u8::from(blocking),
            _buffers: PhantomData,
        }
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    pub fn function(&self) -> u32 {
        self.function
    }

    pub fn blocking(&self) -> bool {
        self.blocking != 0
    }

    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn set_status(&mut self, status: u32) {
        self.status = status;
    }

    pub fn payload(&self) -> &[u8] {
        if self.payload_ptr.is_null() {
            return &[];
        }
        // SAFETY: built from a `&'a [u8]` of exactly this length; the
        // fields are private and `'a` outlives `self`.
        unsafe { core::slice::from_raw_parts(self.payload_ptr, self.payload_len as usize) }
    }

    pub fn has_result_buffer(&self) -> bool {
        !self.result_ptr.is_null()
    }

    pub fn result_len(&self) -> u32 {
        self.result_len
    }

    /// Result buffer, if one was attached.
    pub fn result_mut(&mut self) -> Option<&mut [u8]> {
        if self.result_ptr.is_null() {
            return None;
        }
        // SAFETY: built from a `&'a mut [u8]` moved into this block;
        // `&mut self` guarantees exclusive access.
        Some(unsafe { core::slice::from_raw_parts_mut(self.result_ptr, self.result_len as usize) })
    }

    /// Record how many result bytes were written. Never grows the buffer.
    pub fn set_result_written(&mut self, written: usize) {
        self.result_len = self.result_len.min(written as u32);
    }

    /// Pointer for the native call.
    pub fn as_mut_ptr(&mut self) -> *mut Self {
        self
    }
}

// ───────────────────────────────────────────────────────────────
// Payload fetch block
// ───────────────────────────────────────────────────────────────

/// Native block for fetching a complex event's payload by message id.
#[repr(C)]
pub struct RawPayloadRequest<'a> {
    message_id: u32,
    payload_ptr: *mut u8,
    payload_len: u32,
    _buffer: PhantomData<&'a mut [u8]>,
}

impl<'a> RawPayloadRequest<'a> {
    pub fn new(message_id: u32, buffer: &'a mut [u8]) -> Self {
        Self {
            message_id,
            payload_ptr: buffer.as_mut_ptr(),
            payload_len: buffer.len() as u32,
            _buffer: PhantomData,
        }
    }

    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    pub fn capacity(&self) -> usize {
        self.payload_len as usize
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        // SAFETY: built from a `&'a mut [u8]` of this length.
        unsafe { core::slice::from_raw_parts_mut(self.payload_ptr, self.payload_len as usize) }
    }

    pub fn set_written(&mut self, written: usize) {
        self.payload_len = self.payload_len.min(written as u32);
    }

    pub fn as_mut_ptr(&mut self) -> *mut Self {
        self
    }
}
