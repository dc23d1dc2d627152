//! System interface: device information, restart, coprocessor error
//! reports, and the pump's fatal-error notice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::app::events::NetworkEvent;
use crate::app::ports::NetworkEventSink;
use crate::error::ChannelError;
use crate::logging::Logger;
use crate::proto::channel::CommandChannel;
use crate::proto::codec::RawEvent;
use crate::proto::messages::{DeviceInformation, ErrorEventData};
use crate::proto::types::{Interface, StatusCode, SystemFunction};
use crate::sync::lock;
use crate::{log_debug, log_error, log_info, log_warn};

pub struct SystemMonitor {
    channel: Arc<CommandChannel>,
    sink: Arc<dyn NetworkEventSink>,
    coprocessor_started: AtomicBool,
    pump_failed: AtomicBool,
    last_error: Mutex<Option<ErrorEventData>>,
    log: Logger,
}

impl SystemMonitor {
    pub fn new(channel: Arc<CommandChannel>, sink: Arc<dyn NetworkEventSink>, log: Logger) -> Self {
        Self {
            channel,
            sink,
            coprocessor_started: AtomicBool::new(false),
            pump_failed: AtomicBool::new(false),
            last_error: Mutex::new(None),
            log,
        }
    }

    pub fn device_information(&self) -> Result<DeviceInformation, ChannelError> {
        self.channel.query(
            Interface::System,
            SystemFunction::GetDeviceInformation.code(),
            None,
        )
    }

    /// Ask the coprocessor to reboot. Does not wait for it to come back.
    pub fn restart(&self) -> StatusCode {
        self.coprocessor_started.store(false, Ordering::Release);
        self.channel
            .send(Interface::System, SystemFunction::Restart.code(), false, None)
    }

    pub fn coprocessor_started(&self) -> bool {
        self.coprocessor_started.load(Ordering::Acquire)
    }

    /// Set once the event pump has stopped for good.
    pub fn pump_failed(&self) -> bool {
        self.pump_failed.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<ErrorEventData> {
        lock(&self.last_error).clone()
    }

    fn error_data(&self, event: &RawEvent) -> ErrorEventData {
        event
            .decode_payload::<ErrorEventData>()
            .unwrap_or_else(|_| ErrorEventData {
                code: event.status.code(),
                message: String::new(),
            })
    }

    /// Apply one System event. Runs on the System dispatch lane.
    pub fn handle_event(&self, event: &RawEvent) {
        match SystemFunction::from_code(event.function) {
            Some(SystemFunction::CoprocessorStarted) => {
                self.coprocessor_started.store(true, Ordering::Release);
                log_info!(self.log, "coprocessor started");
                self.sink.emit(&NetworkEvent::CoprocessorStarted);
            }
            Some(SystemFunction::ErrorReported) => {
                let data = self.error_data(event);
                log_warn!(self.log, "coprocessor error {}: {}", data.code, data.message);
                self.sink.emit(&NetworkEvent::CoprocessorError {
                    code: data.code,
                    message: data.message.clone(),
                });
                *lock(&self.last_error) = Some(data);
            }
            Some(SystemFunction::PumpFailed) => {
                let data = self.error_data(event);
                self.pump_failed.store(true, Ordering::Release);
                log_error!(self.log, "event pump stopped: {}", data.message);
                self.sink.emit(&NetworkEvent::PumpFailed {
                    code: data.code,
                    message: data.message.clone(),
                });
                *lock(&self.last_error) = Some(data);
            }
            _ => log_debug!(self.log, "ignoring System event {:#x}", event.function),
        }
    }
}
