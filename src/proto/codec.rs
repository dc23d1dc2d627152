//! Binary record codec.
//!
//! Wire conventions (little-endian, matching the coprocessor):
//! ```text
//! fixed field      : u8 | u32 LE | i8 | [u8; N]
//! variable field   : ┌──────────────┬─────────────────────┐
//!                    │ length u32 LE│ bytes[length]       │
//!                    └──────────────┴─────────────────────┘
//! event header (22): ┌────┬──────────┬────────┬────────┬──────────┐
//!                    │ if │ function │ status │ msg id │ reserved │
//!                    │ u8 │ u32      │ u32    │ u32    │ 9 bytes  │
//!                    └────┴──────────┴────────┴────────┴──────────┘
//! ```
//!
//! Everything here is pure: a [`Reader`] borrows its input, a [`Writer`]
//! owns its output, and neither touches shared state, so any number of
//! threads can encode and decode concurrently.

use crate::error::CodecError;

use super::types::{Interface, StatusCode};

/// Transport ceiling for a single transaction payload.
pub const MAX_PAYLOAD: usize = 4000;

/// Size of one record on the event queue.
pub const EVENT_RECORD_SIZE: usize = 22;

const EVENT_RESERVED: usize = 9;

// ───────────────────────────────────────────────────────────────
// Record trait
// ───────────────────────────────────────────────────────────────

/// A typed record with a fixed binary layout.
pub trait WireRecord: Sized {
    /// Exact number of bytes [`encode`](Self::encode) will produce.
    fn encoded_len(&self) -> usize;

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError>;

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError>;

    /// Encode into a fresh buffer bounded by [`MAX_PAYLOAD`].
    fn to_vec(&self) -> Result<Vec<u8>, CodecError> {
        let len = self.encoded_len();
        if len > MAX_PAYLOAD {
            return Err(CodecError::PayloadTooLarge { len, max: MAX_PAYLOAD });
        }
        let mut w = Writer::with_capacity(len, MAX_PAYLOAD);
        self.encode(&mut w)?;
        Ok(w.into_inner())
    }

    /// Decode a record that must occupy the whole of `bytes`.
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let record = Self::decode(&mut r)?;
        r.finish()?;
        Ok(record)
    }
}

/// Encoded size of a length-prefixed field.
pub const fn var_len(payload: usize) -> usize {
    4 + payload
}

// ───────────────────────────────────────────────────────────────
// Writer
// ───────────────────────────────────────────────────────────────

/// Append-only encoder with a hard size limit.
pub struct Writer {
    buf: Vec<u8>,
    limit: usize,
}

impl Writer {
    pub fn new(limit: usize) -> Self {
        Self { buf: Vec::new(), limit }
    }

    pub fn with_capacity(capacity: usize, limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity.min(limit)),
            limit,
        }
    }

    fn reserve(&mut self, n: usize) -> Result<(), CodecError> {
        let len = self.buf.len() + n;
        if len > self.limit {
            return Err(CodecError::PayloadTooLarge { len, max: self.limit });
        }
        Ok(())
    }

    pub fn put_u8(&mut self, v: u8) -> Result<(), CodecError> {
        self.reserve(1)?;
        self.buf.push(v);
        Ok(())
    }

    pub fn put_i8(&mut self, v: i8) -> Result<(), CodecError> {
        self.put_u8(v as u8)
    }

    pub fn put_bool(&mut self, v: bool) -> Result<(), CodecError> {
        self.put_u8(u8::from(v))
    }

    pub fn put_u32(&mut self, v: u32) -> Result<(), CodecError> {
        self.reserve(4)?;
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    /// Fixed-width field, no length prefix.
    pub fn put_fixed(&mut self, data: &[u8]) -> Result<(), CodecError> {
        self.reserve(data.len())?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Length-prefixed byte field.
    pub fn put_bytes(&mut self, data: &[u8]) -> Result<(), CodecError> {
        self.reserve(var_len(data.len()))?;
        self.buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Length-prefixed ASCII string.
    pub fn put_str(&mut self, s: &str) -> Result<(), CodecError> {
        if !s.is_ascii() {
            return Err(CodecError::MalformedRecord("string is not ASCII"));
        }
        self.put_bytes(s.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

// ───────────────────────────────────────────────────────────────
// Reader
// ───────────────────────────────────────────────────────────────

/// Bounds-checked cursor over a received buffer.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fails if any unread bytes are left.
    pub fn finish(&self) -> Result<(), CodecError> {
        if self.remaining() != 0 {
            return Err(CodecError::MalformedRecord("trailing bytes after record"));
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::MalformedRecord("field runs past end of buffer"));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.u8()? as i8)
    }

    pub fn bool(&mut self) -> Result<bool, CodecError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::MalformedRecord("boolean out of range")),
        }
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn fixed<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Length-prefixed byte field. The declared length is checked
    /// against the remaining input before anything is sliced.
    pub fn bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let declared = self.u32()? as usize;
        if declared > self.remaining() {
            return Err(CodecError::MalformedRecord("declared length exceeds buffer"));
        }
        self.take(declared)
    }

    fn ascii(&mut self) -> Result<&'a str, CodecError> {
        let raw = self.bytes()?;
        if !raw.is_ascii() {
            return Err(CodecError::MalformedRecord("string is not ASCII"));
        }
        core::str::from_utf8(raw).map_err(|_| CodecError::MalformedRecord("string is not ASCII"))
    }

    /// ASCII string into a fixed-capacity field.
    pub fn string<const N: usize>(&mut self) -> Result<heapless::String<N>, CodecError> {
        let s = self.ascii()?;
        let mut out = heapless::String::new();
        out.push_str(s)
            .map_err(|_| CodecError::MalformedRecord("string exceeds field capacity"))?;
        Ok(out)
    }

    /// ASCII string with no fixed capacity (bounded by the buffer).
    pub fn string_owned(&mut self) -> Result<String, CodecError> {
        Ok(self.ascii()?.to_owned())
    }
}

// ───────────────────────────────────────────────────────────────
// Event header
// ───────────────────────────────────────────────────────────────

/// Fixed record read from the event queue.
///
/// `interface` stays raw so an unknown code is a dispatch-time drop
/// rather than a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
    pub interface: u8,
    pub function: u32,
    pub status: StatusCode,
    pub message_id: u32,
}

impl EventHeader {
    /// Simple events are fully described by the header.
    pub fn is_simple(&self) -> bool {
        self.message_id == 0
    }

    pub fn interface(&self) -> Option<Interface> {
        Interface::from_code(self.interface)
    }

    /// Decode from exactly one queue record.
    pub fn parse(record: &[u8; EVENT_RECORD_SIZE]) -> Result<Self, CodecError> {
        Self::from_bytes(record)
    }

    /// Encode into a queue record (reserved bytes zeroed).
    pub fn to_record(&self) -> [u8; EVENT_RECORD_SIZE] {
        let mut out = [0u8; EVENT_RECORD_SIZE];
        out[0] = self.interface;
        out[1..5].copy_from_slice(&self.function.to_le_bytes());
        out[5..9].copy_from_slice(&self.status.code().to_le_bytes());
        out[9..13].copy_from_slice(&self.message_id.to_le_bytes());
        out
    }
}

impl WireRecord for EventHeader {
    fn encoded_len(&self) -> usize {
        EVENT_RECORD_SIZE
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_fixed(&self.to_record())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let interface = r.u8()?;
        let function = r.u32()?;
        let status = StatusCode::from_code(r.u32()?);
        let message_id = r.u32()?;
        r.fixed::<EVENT_RESERVED>()?;
        Ok(Self {
            interface,
            function,
            status,
            message_id,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Raw event
// ───────────────────────────────────────────────────────────────

/// The unit handed to dispatch: a header joined with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub interface: Interface,
    pub function: u32,
    pub status: StatusCode,
    pub payload: Vec<u8>,
}

impl RawEvent {
    pub fn new(interface: Interface, function: u32, status: StatusCode, payload: Vec<u8>) -> Self {
        Self {
            interface,
            function,
            status,
            payload,
        }
    }

    /// Decode the payload as a typed record.
    pub fn decode_payload<R: WireRecord>(&self) -> Result<R, CodecError> {
        R::from_bytes(&self.payload)
    }
}
