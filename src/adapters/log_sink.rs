//! Log-based network event sink.
//!
//! Implements [`NetworkEventSink`] by writing every notification to the
//! `log` facade under the `coproc::events` target. An application bus
//! adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::NetworkEvent;
use crate::app::ports::NetworkEventSink;

const TARGET: &str = "coproc::events";

fn mac(m: &[u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        m[0], m[1], m[2], m[3], m[4], m[5]
    )
}

/// Adapter that logs every [`NetworkEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl NetworkEventSink for LogEventSink {
    fn emit(&self, event: &NetworkEvent) {
        match event {
            NetworkEvent::InterfaceStarted(iface) => info!(target: TARGET, "IFACE | {iface} started"),
            NetworkEvent::InterfaceStopped(iface) => info!(target: TARGET, "IFACE | {iface} stopped"),
            NetworkEvent::Connected { interface, ip, ssid } => {
                info!(
                    target: TARGET,
                    "LINK  | {} up | ip={} mask={} gw={}{}",
                    interface,
                    ip.ip,
                    ip.netmask,
                    ip.gateway,
                    ssid.as_ref().map(|s| format!(" ssid='{s}'")).unwrap_or_default(),
                );
            }
            NetworkEvent::Disconnected { interface, reason } => {
                info!(target: TARGET, "LINK  | {interface} down (reason {reason})");
            }
            NetworkEvent::AccessPointStarted => info!(target: TARGET, "AP    | started"),
            NetworkEvent::AccessPointStopped => info!(target: TARGET, "AP    | stopped"),
            NetworkEvent::StationJoined { mac: m, aid } => {
                info!(target: TARGET, "AP    | station {} joined (aid {})", mac(m), aid);
            }
            NetworkEvent::StationLeft { mac: m, aid } => {
                info!(target: TARGET, "AP    | station {} left (aid {})", mac(m), aid);
            }
            NetworkEvent::CoprocessorStarted => info!(target: TARGET, "SYS   | coprocessor started"),
            NetworkEvent::CoprocessorError { code, message } => {
                warn!(target: TARGET, "SYS   | coprocessor error {code}: {message}");
            }
            NetworkEvent::PumpFailed { code, message } => {
                error!(target: TARGET, "SYS   | event pump stopped ({code}): {message}");
            }
        }
    }
}
