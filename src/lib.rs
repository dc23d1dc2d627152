//! Host-side driver for an ESP32 network coprocessor.
//!
//! Commands travel over a native control call; results and unsolicited
//! events come back through a kernel message queue drained by a single
//! pump thread and fanned out per interface.
//!
//! ```text
//!  app ──▶ Coprocessor ──▶ adapters::{wifi, ethernet, system}
//!                               │            ▲
//!                               ▼            │
//!                    proto::CommandChannel   proto::Dispatcher ◀── proto::EventPump
//!                               │                                       ▲
//!                               └──────▶ proto::Transport ──────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod proto;

mod sync;

pub use app::coprocessor::Coprocessor;
pub use config::CoprocConfig;
pub use error::{Error, Result};
