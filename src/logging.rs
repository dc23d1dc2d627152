//! Per-component logger handles.
//!
//! Components never consult process-wide verbosity flags. Each one is
//! handed a [`Logger`] at construction carrying its own `log` target and
//! level ceiling; the `log_*!` macros below check that ceiling before
//! forwarding to the `log` facade.

use log::{Level, LevelFilter};

/// Log target plus the maximum level this component emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logger {
    target: &'static str,
    level: LevelFilter,
}

impl Logger {
    pub const fn new(target: &'static str, level: LevelFilter) -> Self {
        Self { target, level }
    }

    /// A logger that emits nothing.
    pub const fn off(target: &'static str) -> Self {
        Self::new(target, LevelFilter::Off)
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }
}

#[macro_export]
#[doc(hidden)]
macro_rules! log_at {
    ($logger:expr, $lvl:expr, $($arg:tt)+) => {{
        let logger: &$crate::logging::Logger = &$logger;
        if logger.enabled($lvl) {
            ::log::log!(target: logger.target(), $lvl, $($arg)+);
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, ::log::Level::Error, $($arg)+) };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, ::log::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, ::log::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, ::log::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, ::log::Level::Trace, $($arg)+) };
}
