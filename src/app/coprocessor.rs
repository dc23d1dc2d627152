//! Coprocessor facade — subsystem bring-up and the handles applications
//! hold on to.
//!
//! ```text
//!               ┌───────────────────────────── Coprocessor ──┐
//!  Transport ──▶│ CommandChannel ◀── WifiAdapter             │
//!               │      ▲            SystemMonitor            │──▶ NetworkEventSink
//!               │ EventPump ──▶ Dispatcher ──▶ EthernetAdapter (lazy)
//!               └────────────────────────────────────────────┘
//! ```
//!
//! WiFi and System handlers are attached before the pump starts, so none
//! of their events can be missed. The Ethernet adapter attaches on first
//! use; anything it missed is replayed from the pending buffer.

use std::sync::{Arc, Mutex};

use crate::adapters::ethernet::EthernetAdapter;
use crate::adapters::system::SystemMonitor;
use crate::adapters::wifi::WifiAdapter;
use crate::config::{Component, CoprocConfig};
use crate::error::{Error, Result};
use crate::proto::channel::CommandChannel;
use crate::proto::codec::RawEvent;
use crate::proto::dispatch::{DispatchError, Dispatcher, EventHandler};
use crate::proto::pump::{EventPump, PumpStatsSnapshot};
use crate::proto::transport::Transport;
use crate::proto::types::Interface;
use crate::sync::lock;

use super::ports::NetworkEventSink;

pub struct Coprocessor {
    config: CoprocConfig,
    channel: Arc<CommandChannel>,
    dispatcher: Arc<Dispatcher>,
    pump: EventPump,
    sink: Arc<dyn NetworkEventSink>,
    wifi: Arc<WifiAdapter>,
    system: Arc<SystemMonitor>,
    ethernet: Mutex<Option<Arc<EthernetAdapter>>>,
}

impl Coprocessor {
    /// Validate `config`, build the channel and dispatch table, attach the
    /// WiFi and System handlers, then start the event pump.
    pub fn start(
        config: CoprocConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn NetworkEventSink>,
    ) -> Result<Self> {
        config.validate()?;

        let channel = Arc::new(CommandChannel::new(
            transport.clone(),
            config.max_payload,
            config.logger(Component::Channel),
        ));
        let dispatcher = Arc::new(
            Dispatcher::new(&config.buffered_interfaces, config.logger(Component::Dispatch))
                .map_err(|_| Error::Init("failed to spawn dispatch lanes"))?,
        );

        let wifi = Arc::new(WifiAdapter::new(
            channel.clone(),
            sink.clone(),
            &config,
            config.logger(Component::Wifi),
        ));
        let handler = wifi.clone();
        dispatcher.register(Interface::WiFi, move |e: &RawEvent| handler.handle_event(e))?;

        let system = Arc::new(SystemMonitor::new(
            channel.clone(),
            sink.clone(),
            config.logger(Component::System),
        ));
        let handler = system.clone();
        dispatcher.register(Interface::System, move |e: &RawEvent| handler.handle_event(e))?;

        let pump = EventPump::spawn(
            transport,
            channel.clone(),
            dispatcher.clone(),
            config.logger(Component::Pump),
        )
        .map_err(|_| Error::Init("failed to spawn event pump"))?;

        Ok(Self {
            config,
            channel,
            dispatcher,
            pump,
            sink,
            wifi,
            system,
            ethernet: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &CoprocConfig {
        &self.config
    }

    pub fn wifi(&self) -> &Arc<WifiAdapter> {
        &self.wifi
    }

    pub fn system(&self) -> &Arc<SystemMonitor> {
        &self.system
    }

    /// The Ethernet adapter, attached on first call.
    pub fn ethernet(&self) -> Result<Arc<EthernetAdapter>> {
        let mut slot = lock(&self.ethernet);
        if let Some(adapter) = slot.as_ref() {
            return Ok(adapter.clone());
        }
        let adapter = Arc::new(EthernetAdapter::new(
            self.channel.clone(),
            self.sink.clone(),
            self.config.logger(Component::Ethernet),
        ));
        let handler = adapter.clone();
        self.dispatcher
            .register(Interface::Ethernet, move |e: &RawEvent| handler.handle_event(e))?;
        *slot = Some(adapter.clone());
        Ok(adapter)
    }

    /// Attach a custom consumer for an interface without a built-in
    /// adapter (Bluetooth, Cellular, Transport). Returns how many buffered
    /// events were replayed into it.
    pub fn register_handler(
        &self,
        interface: Interface,
        handler: impl EventHandler,
    ) -> core::result::Result<usize, DispatchError> {
        self.dispatcher.register(interface, handler)
    }

    /// Raw command access for interfaces without a built-in adapter.
    pub fn channel(&self) -> &Arc<CommandChannel> {
        &self.channel
    }

    pub fn pump_stats(&self) -> PumpStatsSnapshot {
        self.pump.stats()
    }

    pub fn pump_running(&self) -> bool {
        self.pump.is_running()
    }

    pub fn pending_events(&self, interface: Interface) -> usize {
        self.dispatcher.pending_len(interface)
    }
}
