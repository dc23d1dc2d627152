//! Coprocessor subsystem configuration.
//!
//! Every field has a working default. A JSON document may override any
//! subset; [`CoprocConfig::validate`] rejects out-of-range values instead
//! of clamping them.

use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::Logger;
use crate::proto::codec::MAX_PAYLOAD;
use crate::proto::types::Interface;

/// Longest accepted connect timeout (10 min).
pub const MAX_CONNECT_TIMEOUT_MS: u32 = 600_000;

/// Core subsystem configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoprocConfig {
    // --- Transport ---
    /// POSIX message queue carrying event records (must start with '/')
    pub event_queue: String,
    /// Character device accepting command ioctls
    pub device_path: String,
    /// ioctl request number for command transactions
    pub ioctl_send_command: u32,
    /// ioctl request number for complex-event payload fetches
    pub ioctl_fetch_payload: u32,
    /// Largest request, result or event payload in bytes
    pub max_payload: usize,

    // --- Connection ---
    /// How long a WiFi connect waits for its confirmation event
    pub connect_timeout_ms: u32,
    /// Ask the coprocessor to reconnect on link loss
    pub auto_reconnect: bool,

    // --- Dispatch ---
    /// Interfaces whose events are held until the first handler registers
    pub buffered_interfaces: Vec<Interface>,

    // --- Logging ---
    pub log: LogConfig,
}

impl Default for CoprocConfig {
    fn default() -> Self {
        Self {
            event_queue: "/Esp32Events".into(),
            device_path: "/dev/esp32".into(),
            ioctl_send_command: 0xC020_4501,
            ioctl_fetch_payload: 0xC010_4502,
            max_payload: MAX_PAYLOAD,

            connect_timeout_ms: 60_000,
            auto_reconnect: true,

            buffered_interfaces: vec![Interface::Ethernet],

            log: LogConfig::default(),
        }
    }
}

impl CoprocConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.event_queue.starts_with('/') || self.event_queue.len() < 2 {
            return Err(ConfigError::ValidationFailed(
                "event_queue must be a name starting with '/'",
            ));
        }
        if self.event_queue[1..].contains('/') {
            return Err(ConfigError::ValidationFailed(
                "event_queue must not contain further '/'",
            ));
        }
        if self.device_path.is_empty() {
            return Err(ConfigError::ValidationFailed("device_path must not be empty"));
        }
        if !(1..=MAX_PAYLOAD).contains(&self.max_payload) {
            return Err(ConfigError::ValidationFailed("max_payload must be 1–4000"));
        }
        if !(1..=MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "connect_timeout_ms must be 1–600000",
            ));
        }
        for (i, iface) in self.buffered_interfaces.iter().enumerate() {
            if self.buffered_interfaces[..i].contains(iface) {
                return Err(ConfigError::ValidationFailed(
                    "buffered_interfaces contains a duplicate",
                ));
            }
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.connect_timeout_ms))
    }

    /// Logger handle for one component.
    pub fn logger(&self, component: Component) -> Logger {
        Logger::new(component.target(), self.log.level(component))
    }
}

// ───────────────────────────────────────────────────────────────
// Logging
// ───────────────────────────────────────────────────────────────

/// Components that receive their own [`Logger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Channel,
    Pump,
    Dispatch,
    Wifi,
    Ethernet,
    System,
}

impl Component {
    pub const fn target(self) -> &'static str {
        match self {
            Self::Channel => "coproc::channel",
            Self::Pump => "coproc::pump",
            Self::Dispatch => "coproc::dispatch",
            Self::Wifi => "coproc::wifi",
            Self::Ethernet => "coproc::ethernet",
            Self::System => "coproc::system",
        }
    }
}

/// Per-component verbosity ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub channel: LevelFilter,
    pub pump: LevelFilter,
    pub dispatch: LevelFilter,
    pub wifi: LevelFilter,
    pub ethernet: LevelFilter,
    pub system: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            channel: LevelFilter::Warn,
            pump: LevelFilter::Info,
            dispatch: LevelFilter::Info,
            wifi: LevelFilter::Info,
            ethernet: LevelFilter::Info,
            system: LevelFilter::Info,
        }
    }
}

impl LogConfig {
    /// Same ceiling for every component.
    pub fn uniform(level: LevelFilter) -> Self {
        Self {
            channel: level,
            pump: level,
            dispatch: level,
            wifi: level,
            ethernet: level,
            system: level,
        }
    }

    pub fn level(&self, component: Component) -> LevelFilter {
        match component {
            Component::Channel => self.channel,
            Component::Pump => self.pump,
            Component::Dispatch => self.dispatch,
            Component::Wifi => self.wifi,
            Component::Ethernet => self.ethernet,
            Component::System => self.system,
        }
    }
}
