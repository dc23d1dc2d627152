//! Coprocessor command/event protocol.
//!
//! ```text
//!  caller ─▶ CommandChannel ─▶ Transport::control ─────────────▶ coprocessor
//!                                                                     │
//!  handler ◀─ Dispatcher lane ◀─ EventPump ◀─ Transport::read_event ◀─┘
//!     │                            └──────▶ CommandChannel::fetch_payload
//!     └─▶ Resolver::resolve ─▶ Rendezvous::wait (blocked connect caller)
//! ```
//!
//! - [`codec`] / [`messages`] / [`types`]: little-endian wire records
//! - [`transport`]: the native call boundary
//! - [`channel`]: one request/response per call
//! - [`pump`]: the single event-queue reader
//! - [`dispatch`] / [`pending`]: per-interface delivery
//! - [`rendezvous`]: one-shot async-to-sync bridge

pub mod channel;
pub mod codec;
pub mod dispatch;
pub mod messages;
pub mod pending;
pub mod pump;
pub mod rendezvous;
pub mod transport;
pub mod types;

pub use channel::CommandChannel;
pub use codec::{EventHeader, RawEvent, WireRecord};
pub use dispatch::{Dispatcher, EventHandler};
pub use pump::{EventPump, PumpStatsSnapshot};
pub use rendezvous::{CancelToken, Rendezvous, Resolver, rendezvous};
pub use transport::Transport;
pub use types::{Interface, StatusCode};
