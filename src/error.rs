//! Unified error types for the coprocessor driver.
//!
//! Each layer owns a small error enum; all of them convert into the
//! crate-wide [`Error`] so the facade and the demo binary can propagate
//! with `?` without caring which layer failed.

use core::fmt;

use crate::proto::dispatch::DispatchError;
use crate::proto::types::StatusCode;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the driver funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A record could not be encoded or decoded.
    Codec(CodecError),
    /// A command transaction failed before or inside the transport.
    Channel(ChannelError),
    /// The event queue could not be read.
    Queue(QueueError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
    /// A handler could not be attached.
    Dispatch(DispatchError),
    /// Subsystem initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Queue(e) => write!(f, "event queue: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// A variable field or whole record exceeds the transport ceiling.
    PayloadTooLarge { len: usize, max: usize },
    /// A declared length or value does not fit the buffer it came from.
    MalformedRecord(&'static str),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload too large ({len} bytes, max {max})")
            }
            Self::MalformedRecord(why) => write!(f, "malformed record: {why}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Command channel errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The native control call returned a nonzero code.
    Transport(i32),
    /// The coprocessor accepted the call but reported a failure status.
    Status(StatusCode),
    /// The response could not be decoded.
    Codec(CodecError),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(code) => write!(f, "transport call failed (code {code})"),
            Self::Status(status) => write!(f, "coprocessor returned {status}"),
            Self::Codec(e) => write!(f, "{e}"),
        }
    }
}

impl From<CodecError> for ChannelError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl std::error::Error for ChannelError {}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

// ---------------------------------------------------------------------------
// Event queue errors
// ---------------------------------------------------------------------------

/// Failure of the blocking event-queue read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The read was interrupted by a signal (EINTR); retry.
    Interrupted,
    /// Any other OS error (raw errno).
    Os(i32),
    /// The queue was closed underneath the reader.
    Closed,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted system call"),
            Self::Os(errno) => write!(f, "OS error {errno}"),
            Self::Closed => write!(f, "queue closed"),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config document could not be parsed.
    Parse(String),
    /// A field failed range validation. Names the field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Driver-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
