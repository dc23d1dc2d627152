//! Command channel — one request/response transaction per call.
//!
//! ```text
//!  caller ──▶ encode ──▶ RawCommand (borrows buffers) ──▶ Transport::control
//!         ◀── StatusCode + result bytes ◀──────────────────────┘
//! ```
//!
//! The channel holds no lock: every call owns its request and result
//! buffers, so concurrent callers cannot corrupt each other. Ordering of
//! side effects between concurrent callers is left to the coprocessor.
//! Transport failures are reported as [`StatusCode::Failure`] and never
//! retried here.

use std::sync::Arc;

use crate::error::ChannelError;
use crate::logging::Logger;
use crate::{log_error, log_trace, log_warn};

use super::codec::{MAX_PAYLOAD, WireRecord};
use super::transport::{RawCommand, RawPayloadRequest, Transport};
use super::types::{Interface, StatusCode};

pub struct CommandChannel {
    transport: Arc<dyn Transport>,
    max_payload: usize,
    log: Logger,
}

impl CommandChannel {
    pub fn new(transport: Arc<dyn Transport>, max_payload: usize, log: Logger) -> Self {
        Self {
            transport,
            max_payload: max_payload.min(MAX_PAYLOAD),
            log,
        }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Issue a command that returns no data.
    pub fn send(
        &self,
        destination: Interface,
        function: u32,
        blocking: bool,
        request: Option<&[u8]>,
    ) -> StatusCode {
        self.transact(destination, function, blocking, request, 0).0
    }

    /// Issue a command and collect up to `result_capacity` bytes of reply.
    ///
    /// For non-blocking calls the capacity is ignored and the returned
    /// buffer is always empty.
    pub fn send_with_result(
        &self,
        destination: Interface,
        function: u32,
        blocking: bool,
        request: Option<&[u8]>,
        result_capacity: usize,
    ) -> (StatusCode, Vec<u8>) {
        self.transact(destination, function, blocking, request, result_capacity)
    }

    /// Encode `request` and issue it.
    pub fn send_record<R: WireRecord>(
        &self,
        destination: Interface,
        function: u32,
        blocking: bool,
        request: &R,
    ) -> Result<StatusCode, ChannelError> {
        let bytes = request.to_vec()?;
        Ok(self.send(destination, function, blocking, Some(&bytes)))
    }

    /// Blocking query decoding a typed reply. Any status other than
    /// `CompletedOk` is returned as [`ChannelError::Status`].
    pub fn query<Resp: WireRecord>(
        &self,
        destination: Interface,
        function: u32,
        request: Option<&[u8]>,
    ) -> Result<Resp, ChannelError> {
        let (status, reply) =
            self.transact(destination, function, true, request, self.max_payload);
        if !status.is_ok() {
            return Err(ChannelError::Status(status));
        }
        Ok(Resp::from_bytes(&reply)?)
    }

    /// Fetch the variable payload of a complex event.
    pub fn fetch_payload(&self, message_id: u32) -> Result<Vec<u8>, ChannelError> {
        let mut buf = vec![0u8; self.max_payload];
        let (rc, written) = {
            let mut req = RawPayloadRequest::new(message_id, &mut buf);
            let rc = self.transport.fetch_payload(&mut req);
            (rc, req.capacity())
        };
        if rc != 0 {
            log_warn!(
                self.log,
                "payload fetch for message {} failed (transport code {})",
                message_id,
                rc
            );
            return Err(ChannelError::Transport(rc));
        }
        buf.truncate(written);
        log_trace!(self.log, "fetched {} payload bytes for message {}", written, message_id);
        Ok(buf)
    }

    fn transact(
        &self,
        destination: Interface,
        function: u32,
        blocking: bool,
        request: Option<&[u8]>,
        result_capacity: usize,
    ) -> (StatusCode, Vec<u8>) {
        let request_len = request.map_or(0, <[u8]>::len);
        if request_len > self.max_payload || result_capacity > self.max_payload {
            log_error!(
                self.log,
                "{} fn {:#x}: buffer exceeds transport limit (request {}, result {}, max {})",
                destination,
                function,
                request_len,
                result_capacity,
                self.max_payload
            );
            return (StatusCode::InvalidParameter, Vec::new());
        }

        let mut result = if blocking && result_capacity > 0 {
            vec![0u8; result_capacity]
        } else {
            Vec::new()
        };

        // The command block borrows both buffers for exactly this scope.
        let (rc, raw_status, written) = {
            let result_buf = (!result.is_empty()).then_some(result.as_mut_slice());
            let mut cmd = RawCommand::new(destination.code(), function, blocking, request, result_buf);
            let rc = self.transport.control(&mut cmd);
            (rc, cmd.status(), cmd.result_len() as usize)
        };

        if rc != 0 {
            log_error!(
                self.log,
                "{} fn {:#x}: transport call failed (code {})",
                destination,
                function,
                rc
            );
            return (StatusCode::Failure, Vec::new());
        }

        let status = StatusCode::from_code(raw_status);
        result.truncate(written);
        log_trace!(
            self.log,
            "{} fn {:#x} -> {} ({} result bytes)",
            destination,
            function,
            status,
            result.len()
        );
        (status, result)
    }
}
