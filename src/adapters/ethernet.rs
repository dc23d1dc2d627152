//! Wired Ethernet adapter.
//!
//! The coprocessor usually brings the PHY up before the application has
//! wired this adapter in, so Ethernet is a buffering interface by default:
//! link events raised early are replayed into [`EthernetAdapter::handle_event`]
//! when the handler registers.

use std::sync::{Arc, Mutex};

use crate::app::events::{IpInfo, NetworkEvent};
use crate::app::ports::NetworkEventSink;
use crate::error::ChannelError;
use crate::logging::Logger;
use crate::proto::channel::CommandChannel;
use crate::proto::codec::RawEvent;
use crate::proto::messages::{EthernetEventData, MacAddress, MacAddressResponse};
use crate::proto::types::{EthernetFunction, Interface, StatusCode};
use crate::sync::lock;
use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EthernetState {
    pub started: bool,
    pub link_up: bool,
    pub ip: IpInfo,
    pub mac: MacAddress,
}

pub struct EthernetAdapter {
    channel: Arc<CommandChannel>,
    sink: Arc<dyn NetworkEventSink>,
    state: Mutex<EthernetState>,
    log: Logger,
}

impl EthernetAdapter {
    pub fn new(channel: Arc<CommandChannel>, sink: Arc<dyn NetworkEventSink>, log: Logger) -> Self {
        Self {
            channel,
            sink,
            state: Mutex::new(EthernetState::default()),
            log,
        }
    }

    pub fn state(&self) -> EthernetState {
        *lock(&self.state)
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).link_up
    }

    pub fn start(&self) -> StatusCode {
        self.channel
            .send(Interface::Ethernet, EthernetFunction::Start.code(), true, None)
    }

    pub fn stop(&self) -> StatusCode {
        self.channel
            .send(Interface::Ethernet, EthernetFunction::Stop.code(), true, None)
    }

    pub fn mac_address(&self) -> Result<MacAddress, ChannelError> {
        let resp: MacAddressResponse = self.channel.query(
            Interface::Ethernet,
            EthernetFunction::GetMacAddress.code(),
            None,
        )?;
        lock(&self.state).mac = resp.mac;
        Ok(resp.mac)
    }

    /// Apply one Ethernet event. Runs on the Ethernet dispatch lane.
    pub fn handle_event(&self, event: &RawEvent) {
        match EthernetFunction::from_code(event.function) {
            Some(EthernetFunction::InterfaceStarted) => {
                lock(&self.state).started = true;
                self.sink
                    .emit(&NetworkEvent::InterfaceStarted(Interface::Ethernet));
            }
            Some(EthernetFunction::InterfaceStopped) => {
                *lock(&self.state) = EthernetState::default();
                self.sink
                    .emit(&NetworkEvent::InterfaceStopped(Interface::Ethernet));
            }
            Some(EthernetFunction::Connected) if event.status.is_ok() => {
                let data = match event.decode_payload::<EthernetEventData>() {
                    Ok(d) => d,
                    Err(e) => {
                        log_warn!(self.log, "bad link-up payload: {}", e);
                        return;
                    }
                };
                let ip = IpInfo {
                    ip: data.ip,
                    netmask: data.netmask,
                    gateway: data.gateway,
                };
                {
                    let mut st = lock(&self.state);
                    st.link_up = true;
                    st.ip = ip;
                    st.mac = data.mac;
                }
                log_info!(self.log, "link up, address {}", ip.ip);
                self.sink.emit(&NetworkEvent::Connected {
                    interface: Interface::Ethernet,
                    ip,
                    ssid: None,
                });
            }
            Some(EthernetFunction::Connected) => {
                log_warn!(self.log, "link-up reported with status {}", event.status);
            }
            Some(EthernetFunction::Disconnected) => {
                {
                    let mut st = lock(&self.state);
                    st.link_up = false;
                    st.ip = IpInfo::default();
                }
                log_info!(self.log, "link down");
                self.sink.emit(&NetworkEvent::Disconnected {
                    interface: Interface::Ethernet,
                    reason: 0,
                });
            }
            _ => log_debug!(self.log, "ignoring Ethernet event {:#x}", event.function),
        }
    }
}
