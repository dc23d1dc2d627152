//! Outbound network notifications.
//!
//! Adapters translate coprocessor events into these and push them through
//! the [`NetworkEventSink`](super::ports::NetworkEventSink) port. Sinks on
//! the other side decide what to do with them: log, forward to an
//! application bus, update a status display.

use std::net::Ipv4Addr;

use crate::proto::messages::{MacAddress, Ssid};
use crate::proto::types::Interface;

/// IP configuration reported on link-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl Default for IpInfo {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// Structured notifications raised by the network adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    InterfaceStarted(Interface),
    InterfaceStopped(Interface),

    /// Link is up with an address. `ssid` is set for WiFi only.
    Connected {
        interface: Interface,
        ip: IpInfo,
        ssid: Option<Ssid>,
    },

    /// Link went down. `reason` is the 802.11 reason for WiFi, 0 otherwise.
    Disconnected { interface: Interface, reason: u8 },

    AccessPointStarted,
    AccessPointStopped,
    StationJoined { mac: MacAddress, aid: u8 },
    StationLeft { mac: MacAddress, aid: u8 },

    /// The coprocessor reported an error of its own.
    CoprocessorError { code: u32, message: String },

    /// The coprocessor finished booting.
    CoprocessorStarted,

    /// The event pump stopped; no further events will arrive.
    PumpFailed { code: u32, message: String },
}
