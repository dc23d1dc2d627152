//! WiFi station and soft-AP adapter.
//!
//! Commands go out through the [`CommandChannel`]; confirmations come back
//! as WiFi events on this adapter's dispatch lane. `connect` and
//! `disconnect` bridge the two with a one-shot rendezvous:
//!
//! ```text
//!  connect()                                  WiFi lane
//!  ─────────                                  ─────────
//!  arm attempt ─────────── Resolver ────────▶ attempt slot
//!  clear details (state lock)
//!  send ConnectToAccessPoint
//!  wait(timeout, cancel) ◀── resolve ──────── ConnectedToAccessPoint /
//!  map status → ConnectionResult              DisconnectedFromAccessPoint
//! ```
//!
//! Adapter state and the attempt slot are separate locks. Handlers always
//! update state first, then resolve with the fields they just captured.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::app::events::{IpInfo, NetworkEvent};
use crate::app::ports::NetworkEventSink;
use crate::config::CoprocConfig;
use crate::error::{ChannelError, CodecError};
use crate::logging::Logger;
use crate::proto::channel::CommandChannel;
use crate::proto::codec::{RawEvent, WireRecord};
use crate::proto::messages::{
    AccessPoint, AccessPointList, Antenna, AntennaResponse, ConnectEventData, ConnectRequest,
    DisconnectEventData, DisconnectRequest, MacAddress, MacAddressResponse, Passphrase,
    ScanRequest, SetAntennaRequest, Ssid, StartAccessPointRequest, StationEventData,
};
use crate::proto::rendezvous::{
    CancelToken, Rendezvous, ResolveError, Resolver, WaitError, rendezvous,
};
use crate::proto::types::{Interface, StatusCode, WifiFunction};
use crate::sync::lock;
use crate::{log_debug, log_info, log_warn};

// ───────────────────────────────────────────────────────────────
// Results
// ───────────────────────────────────────────────────────────────

/// Pre-flight rejection of a connect/disconnect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    /// Another connect or disconnect is still waiting for its event.
    AttemptInProgress,
    Encoding(CodecError),
}

impl From<CodecError> for ConnectivityError {
    fn from(e: CodecError) -> Self {
        Self::Encoding(e)
    }
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 ASCII bytes for WPA2, or empty for open)"
            ),
            Self::AttemptInProgress => write!(f, "another connection attempt is in progress"),
            Self::Encoding(e) => write!(f, "request encoding failed: {e}"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

/// Outcome of a connect or disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Success,
    AuthenticationRefused,
    NetworkNotFound,
    Timeout,
    AlreadyConnected,
    Cancelled,
    /// Anything else; carries the coprocessor's status.
    Unspecified(StatusCode),
}

/// Network details captured from the confirmation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDetails {
    pub ip: IpInfo,
    pub ssid: Ssid,
    pub bssid: MacAddress,
    pub channel: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionResult {
    pub status: ConnectionStatus,
    /// Set on `Success` of a connect.
    pub network: Option<NetworkDetails>,
}

impl ConnectionResult {
    fn bare(status: ConnectionStatus) -> Self {
        Self {
            status,
            network: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ConnectionStatus::Success
    }
}

/// Map a coprocessor status to a connection outcome.
fn map_status(status: StatusCode) -> ConnectionStatus {
    match status {
        StatusCode::CompletedOk => ConnectionStatus::Success,
        StatusCode::AuthenticationFailed => ConnectionStatus::AuthenticationRefused,
        StatusCode::AccessPointNotFound => ConnectionStatus::NetworkNotFound,
        StatusCode::Timeout => ConnectionStatus::Timeout,
        StatusCode::AlreadyStarted => ConnectionStatus::AlreadyConnected,
        other => ConnectionStatus::Unspecified(other),
    }
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<Ssid, ConnectivityError> {
    if ssid.is_empty() || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ssid::try_from(ssid).map_err(|_| ConnectivityError::InvalidSsid)
}

fn validate_password(password: &str) -> Result<Passphrase, ConnectivityError> {
    if !password.is_empty() && (password.len() < 8 || !password.is_ascii()) {
        return Err(ConnectivityError::InvalidPassword);
    }
    Passphrase::try_from(password).map_err(|_| ConnectivityError::InvalidPassword)
}

// ───────────────────────────────────────────────────────────────
// Adapter state
// ───────────────────────────────────────────────────────────────

/// Snapshot of what the adapter knows about the station link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiState {
    pub started: bool,
    pub connected: bool,
    pub ip: IpInfo,
    pub ssid: Ssid,
    pub bssid: MacAddress,
    pub channel: u8,
    pub antenna: Option<Antenna>,
    pub access_point_running: bool,
}

impl WifiState {
    fn clear_network(&mut self) {
        self.connected = false;
        self.ip = IpInfo::default();
        self.ssid.clear();
        self.bssid = [0; 6];
        self.channel = 0;
    }

    fn network(&self) -> NetworkDetails {
        NetworkDetails {
            ip: self.ip,
            ssid: self.ssid.clone(),
            bssid: self.bssid,
            channel: self.channel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptKind {
    Connect,
    Disconnect,
}

/// What the lane hands back to a waiting caller. `network` is captured
/// under the state lock when the confirmation is built, so later events
/// cannot change what the caller sees.
#[derive(Debug, Clone)]
struct Confirmation {
    status: StatusCode,
    network: Option<NetworkDetails>,
}

impl Confirmation {
    fn status_only(status: StatusCode) -> Self {
        Self {
            status,
            network: None,
        }
    }
}

struct Attempt {
    id: u64,
    kind: AttemptKind,
    resolver: Resolver<Confirmation>,
}

/// An armed attempt owned by the calling thread.
struct Armed {
    id: u64,
    waiter: Rendezvous<Confirmation>,
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    channel: Arc<CommandChannel>,
    sink: Arc<dyn NetworkEventSink>,
    state: Mutex<WifiState>,
    attempt: Mutex<Option<Attempt>>,
    next_attempt: AtomicU64,
    connect_timeout: Duration,
    auto_reconnect: bool,
    log: Logger,
}

impl WifiAdapter {
    pub fn new(
        channel: Arc<CommandChannel>,
        sink: Arc<dyn NetworkEventSink>,
        config: &CoprocConfig,
        log: Logger,
    ) -> Self {
        Self {
            channel,
            sink,
            state: Mutex::new(WifiState::default()),
            attempt: Mutex::new(None),
            next_attempt: AtomicU64::new(1),
            connect_timeout: config.connect_timeout(),
            auto_reconnect: config.auto_reconnect,
            log,
        }
    }

    pub fn state(&self) -> WifiState {
        lock(&self.state).clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    fn cmd(&self, function: WifiFunction) -> StatusCode {
        self.channel.send(Interface::WiFi, function.code(), true, None)
    }

    pub fn start(&self) -> StatusCode {
        self.cmd(WifiFunction::Start)
    }

    pub fn stop(&self) -> StatusCode {
        self.cmd(WifiFunction::Stop)
    }

    // ── Connect / disconnect ─────────────────────────────────

    /// Associate with `ssid` and wait for the coprocessor's confirmation.
    ///
    /// Returns after the confirmation event, the configured timeout, or
    /// `cancel`, whichever comes first. A call made while another connect
    /// or disconnect is waiting is rejected with `AttemptInProgress` and
    /// leaves the adapter state alone.
    ///
    /// Confirmation events carry no correlation id. A confirmation that
    /// arrives after an earlier attempt timed out is merged into whichever
    /// attempt is waiting at that moment.
    pub fn connect(
        &self,
        ssid: &str,
        password: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<ConnectionResult, ConnectivityError> {
        let request = ConnectRequest {
            ssid: validate_ssid(ssid)?,
            password: validate_password(password)?,
            reconnect: self.auto_reconnect,
        };
        let payload = request.to_vec()?;

        let armed = self.arm(AttemptKind::Connect)?;
        lock(&self.state).clear_network();
        let result = self.complete(
            armed,
            AttemptKind::Connect,
            WifiFunction::ConnectToAccessPoint,
            &payload,
            cancel,
        );
        if result.is_success() {
            log_info!(self.log, "connected to '{}'", ssid);
        } else {
            log_warn!(self.log, "connect to '{}' failed: {:?}", ssid, result.status);
        }
        Ok(result)
    }

    /// Leave the current network and wait for the confirmation.
    pub fn disconnect(
        &self,
        cancel: Option<&CancelToken>,
    ) -> Result<ConnectionResult, ConnectivityError> {
        if !self.is_connected() {
            log_debug!(self.log, "disconnect requested while not connected");
            return Ok(ConnectionResult::bare(ConnectionStatus::Success));
        }
        let payload = DisconnectRequest { reconnect: false }.to_vec()?;
        let armed = self.arm(AttemptKind::Disconnect)?;
        Ok(self.complete(
            armed,
            AttemptKind::Disconnect,
            WifiFunction::DisconnectFromAccessPoint,
            &payload,
            cancel,
        ))
    }

    /// Claim the attempt slot. Fails without side effects if it is taken.
    fn arm(&self, kind: AttemptKind) -> Result<Armed, ConnectivityError> {
        let mut slot = lock(&self.attempt);
        if slot.is_some() {
            return Err(ConnectivityError::AttemptInProgress);
        }
        let id = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        let (waiter, resolver) = rendezvous();
        *slot = Some(Attempt { id, kind, resolver });
        Ok(Armed { id, waiter })
    }

    /// Send the command for an armed attempt and wait for its outcome.
    fn complete(
        &self,
        armed: Armed,
        kind: AttemptKind,
        function: WifiFunction,
        payload: &[u8],
        cancel: Option<&CancelToken>,
    ) -> ConnectionResult {
        let Armed { id, waiter } = armed;
        let accepted = self
            .channel
            .send(Interface::WiFi, function.code(), true, Some(payload));
        let outcome = if accepted.is_ok() {
            waiter.wait(self.connect_timeout, cancel)
        } else {
            log_warn!(self.log, "{:?} rejected by coprocessor: {}", function, accepted);
            drop(waiter);
            Ok(Confirmation::status_only(accepted))
        };
        // Only release our own attempt; a newer one may already be armed.
        let _ = lock(&self.attempt).take_if(|a| a.id == id);

        match outcome {
            Err(WaitError::Timeout) => {
                log_warn!(
                    self.log,
                    "{:?}: no confirmation within {:?}",
                    function,
                    self.connect_timeout
                );
                ConnectionResult::bare(ConnectionStatus::Timeout)
            }
            Err(WaitError::Cancelled) => ConnectionResult::bare(ConnectionStatus::Cancelled),
            Ok(c) => match kind {
                AttemptKind::Connect if c.network.is_some() && c.status.is_ok() => {
                    ConnectionResult {
                        status: ConnectionStatus::Success,
                        network: c.network,
                    }
                }
                // A disconnect event with an OK status cannot satisfy a connect.
                AttemptKind::Connect if c.status.is_ok() => {
                    ConnectionResult::bare(ConnectionStatus::Unspecified(c.status))
                }
                _ => ConnectionResult::bare(map_status(c.status)),
            },
        }
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn scan(&self, request: &ScanRequest) -> Result<Vec<AccessPoint>, ChannelError> {
        let bytes = request.to_vec()?;
        let list: AccessPointList =
            self.channel
                .query(Interface::WiFi, WifiFunction::Scan.code(), Some(&bytes))?;
        log_debug!(self.log, "scan found {} networks", list.access_points.len());
        Ok(list.access_points)
    }

    pub fn antenna(&self) -> Result<Antenna, ChannelError> {
        let resp: AntennaResponse =
            self.channel
                .query(Interface::WiFi, WifiFunction::GetAntenna.code(), None)?;
        lock(&self.state).antenna = Some(resp.antenna);
        Ok(resp.antenna)
    }

    pub fn set_antenna(&self, antenna: Antenna, persist: bool) -> Result<StatusCode, ChannelError> {
        let status = self.channel.send_record(
            Interface::WiFi,
            WifiFunction::SetAntenna.code(),
            true,
            &SetAntennaRequest { antenna, persist },
        )?;
        if status.is_ok() {
            lock(&self.state).antenna = Some(antenna);
        }
        Ok(status)
    }

    pub fn mac_address(&self) -> Result<MacAddress, ChannelError> {
        let resp: MacAddressResponse =
            self.channel
                .query(Interface::WiFi, WifiFunction::GetMacAddress.code(), None)?;
        Ok(resp.mac)
    }

    pub fn start_access_point(
        &self,
        request: &StartAccessPointRequest,
    ) -> Result<StatusCode, ChannelError> {
        self.channel.send_record(
            Interface::WiFi,
            WifiFunction::StartAccessPoint.code(),
            true,
            request,
        )
    }

    pub fn stop_access_point(&self) -> StatusCode {
        self.cmd(WifiFunction::StopAccessPoint)
    }

    // ── Event handling (WiFi lane) ───────────────────────────

    /// Apply one WiFi event. Runs on the WiFi dispatch lane.
    pub fn handle_event(&self, event: &RawEvent) {
        let Some(function) = WifiFunction::from_code(event.function) else {
            log_debug!(self.log, "ignoring unknown WiFi event {:#x}", event.function);
            return;
        };
        match function {
            WifiFunction::InterfaceStarted => {
                lock(&self.state).started = true;
                self.sink.emit(&NetworkEvent::InterfaceStarted(Interface::WiFi));
            }
            WifiFunction::InterfaceStopped => {
                {
                    let mut st = lock(&self.state);
                    st.started = false;
                    st.clear_network();
                }
                self.sink.emit(&NetworkEvent::InterfaceStopped(Interface::WiFi));
            }
            WifiFunction::ConnectedToAccessPoint => self.on_connected(event),
            WifiFunction::DisconnectedFromAccessPoint => self.on_disconnected(event),
            WifiFunction::AccessPointStarted => {
                lock(&self.state).access_point_running = true;
                self.sink.emit(&NetworkEvent::AccessPointStarted);
            }
            WifiFunction::AccessPointStopped => {
                lock(&self.state).access_point_running = false;
                self.sink.emit(&NetworkEvent::AccessPointStopped);
            }
            WifiFunction::StationConnected | WifiFunction::StationDisconnected => {
                match event.decode_payload::<StationEventData>() {
                    Ok(StationEventData { mac, aid }) => {
                        self.sink.emit(&if function == WifiFunction::StationConnected {
                            NetworkEvent::StationJoined { mac, aid }
                        } else {
                            NetworkEvent::StationLeft { mac, aid }
                        });
                    }
                    Err(e) => log_warn!(self.log, "bad station event payload: {}", e),
                }
            }
            _ => log_debug!(self.log, "ignoring WiFi function {:?} on event lane", function),
        }
    }

    fn on_connected(&self, event: &RawEvent) {
        let data = if event.status.is_ok() {
            match event.decode_payload::<ConnectEventData>() {
                Ok(d) => Some(d),
                Err(e) => {
                    log_warn!(self.log, "bad connect event payload: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let network = {
            let mut st = lock(&self.state);
            match &data {
                Some(d) => {
                    st.connected = true;
                    st.ip = IpInfo {
                        ip: d.ip,
                        netmask: d.netmask,
                        gateway: d.gateway,
                    };
                    st.ssid = d.ssid.clone();
                    st.bssid = d.bssid;
                    st.channel = d.channel;
                    Some(st.network())
                }
                None => {
                    st.clear_network();
                    None
                }
            }
        };

        let status = if event.status.is_ok() && network.is_none() {
            StatusCode::Failure
        } else {
            event.status
        };
        let notice = network.as_ref().map(|n| NetworkEvent::Connected {
            interface: Interface::WiFi,
            ip: n.ip,
            ssid: Some(n.ssid.clone()),
        });
        self.resolve(AttemptKind::Connect, Confirmation { status, network });

        if let Some(notice) = notice {
            self.sink.emit(&notice);
        }
    }

    fn on_disconnected(&self, event: &RawEvent) {
        let reason = match event.decode_payload::<DisconnectEventData>() {
            Ok(d) => d.reason,
            Err(_) => 0,
        };
        let was_connected = {
            let mut st = lock(&self.state);
            let was = st.connected;
            st.clear_network();
            was
        };

        let confirmation = Confirmation::status_only(event.status);
        // A failed association is reported as a disconnect; either attempt
        // kind is waiting on it.
        if !self.resolve(AttemptKind::Disconnect, confirmation.clone()) {
            self.resolve(AttemptKind::Connect, confirmation);
        }

        if was_connected || !event.status.is_ok() {
            self.sink.emit(&NetworkEvent::Disconnected {
                interface: Interface::WiFi,
                reason,
            });
        }
    }

    /// Resolve the outstanding attempt of `kind`, if any. Returns whether
    /// one was taken.
    fn resolve(&self, kind: AttemptKind, confirmation: Confirmation) -> bool {
        let attempt = lock(&self.attempt).take_if(|a| a.kind == kind);
        let Some(attempt) = attempt else {
            return false;
        };
        match attempt.resolver.resolve(confirmation) {
            Ok(()) => {}
            Err(ResolveError::Abandoned) => {
                log_debug!(self.log, "late {:?} confirmation ignored", kind);
            }
            Err(ResolveError::AlreadyResolved) => {
                log_warn!(self.log, "{:?} confirmation resolved twice", kind);
            }
        }
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::SimCoprocessor;
    use crate::app::ports::RecordingSink;
    use crate::proto::codec::MAX_PAYLOAD;
    use std::net::Ipv4Addr;
    use std::thread;

    fn adapter(timeout_ms: u32) -> (Arc<WifiAdapter>, Arc<SimCoprocessor>, Arc<RecordingSink>) {
        let sim = SimCoprocessor::new();
        let channel = Arc::new(CommandChannel::new(sim.clone(), MAX_PAYLOAD, Logger::off("t")));
        let sink = Arc::new(RecordingSink::new());
        let config = CoprocConfig {
            connect_timeout_ms: timeout_ms,
            ..Default::default()
        };
        let a = Arc::new(WifiAdapter::new(channel, sink.clone(), &config, Logger::off("t")));
        (a, sim, sink)
    }

    fn connected_event(status: StatusCode) -> RawEvent {
        let data = ConnectEventData {
            ip: Ipv4Addr::new(192, 168, 1, 20),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
            gateway: Ipv4Addr::new(192, 168, 1, 1),
            ssid: Ssid::try_from("HomeWiFi").unwrap(),
            bssid: [1, 2, 3, 4, 5, 6],
            channel: 6,
            auth_mode: 3,
        };
        RawEvent::new(
            Interface::WiFi,
            WifiFunction::ConnectedToAccessPoint.code(),
            status,
            data.to_vec().unwrap(),
        )
    }

    /// Deliver `event` once the adapter has armed an attempt.
    fn deliver_when_armed(a: &Arc<WifiAdapter>, event: RawEvent) -> thread::JoinHandle<()> {
        let a = a.clone();
        thread::spawn(move || {
            while lock(&a.attempt).is_none() {
                thread::sleep(Duration::from_millis(1));
            }
            a.handle_event(&event);
        })
    }

    #[test]
    fn rejects_empty_ssid() {
        let (a, _, _) = adapter(50);
        assert_eq!(a.connect("", "password123", None), Err(ConnectivityError::InvalidSsid));
    }

    #[test]
    fn rejects_short_password() {
        let (a, _, _) = adapter(50);
        assert_eq!(
            a.connect("MyNet", "short", None),
            Err(ConnectivityError::InvalidPassword)
        );
    }

    #[test]
    fn rejects_overlong_ssid() {
        let (a, _, _) = adapter(50);
        let long = "x".repeat(33);
        assert_eq!(a.connect(&long, "", None), Err(ConnectivityError::InvalidSsid));
    }

    #[test]
    fn connect_success_returns_event_fields() {
        let (a, sim, sink) = adapter(2_000);
        let h = deliver_when_armed(&a, connected_event(StatusCode::CompletedOk));
        let r = a.connect("HomeWiFi", "mysecret8", None).unwrap();
        h.join().unwrap();

        assert_eq!(r.status, ConnectionStatus::Success);
        let net = r.network.unwrap();
        assert_eq!(net.ip.ip, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(net.ssid.as_str(), "HomeWiFi");
        assert_eq!(net.channel, 6);
        assert!(a.is_connected());

        let sent = sim.commands_for(Interface::WiFi, WifiFunction::ConnectToAccessPoint.code());
        let req = ConnectRequest::from_bytes(&sent[0].payload).unwrap();
        assert_eq!(req.password.as_str(), "mysecret8");
        assert!(matches!(sink.events()[0], NetworkEvent::Connected { .. }));
    }

    #[test]
    fn auth_failure_disconnect_maps_to_refused() {
        let (a, _, _) = adapter(2_000);
        let h = deliver_when_armed(
            &a,
            RawEvent::new(
                Interface::WiFi,
                WifiFunction::DisconnectedFromAccessPoint.code(),
                StatusCode::AuthenticationFailed,
                Vec::new(),
            ),
        );
        let r = a.connect("HomeWiFi", "wrongpass", None).unwrap();
        h.join().unwrap();
        assert_eq!(r.status, ConnectionStatus::AuthenticationRefused);
        assert!(r.network.is_none());
        assert!(!a.is_connected());
    }

    #[test]
    fn rejected_command_skips_wait() {
        let (a, sim, _) = adapter(60_000);
        sim.on_command(
            Interface::WiFi,
            WifiFunction::ConnectToAccessPoint.code(),
            crate::adapters::sim::Reply::status(StatusCode::AlreadyStarted),
        );
        let r = a.connect("Net", "", None).unwrap();
        assert_eq!(r.status, ConnectionStatus::AlreadyConnected);
    }

    #[test]
    fn timeout_then_late_event_is_tolerated() {
        let (a, _, _) = adapter(30);
        let r = a.connect("Net", "password1", None).unwrap();
        assert_eq!(r.status, ConnectionStatus::Timeout);
        assert!(lock(&a.attempt).is_none());

        // Late confirmation still updates state without a waiter.
        a.handle_event(&connected_event(StatusCode::CompletedOk));
        assert!(a.is_connected());
    }

    #[test]
    fn cancel_releases_wait() {
        let (a, _, _) = adapter(60_000);
        let token = CancelToken::new();
        let t = token.clone();
        let h = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            t.cancel();
        });
        let r = a.connect("Net", "", Some(&token)).unwrap();
        h.join().unwrap();
        assert_eq!(r.status, ConnectionStatus::Cancelled);
    }

    #[test]
    fn concurrent_attempt_rejected() {
        let (a, _, _) = adapter(300);
        let first = {
            let a = a.clone();
            thread::spawn(move || a.connect("Net", "", None))
        };
        while lock(&a.attempt).is_none() {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(a.connect("Other", "", None), Err(ConnectivityError::AttemptInProgress));
        assert_eq!(first.join().unwrap().unwrap().status, ConnectionStatus::Timeout);
    }

    #[test]
    fn disconnect_when_idle_is_noop() {
        let (a, sim, _) = adapter(50);
        assert!(a.disconnect(None).unwrap().is_success());
        assert!(sim.commands().is_empty());
    }

    #[test]
    fn disconnect_waits_for_confirmation() {
        let (a, _, sink) = adapter(2_000);
        a.handle_event(&connected_event(StatusCode::CompletedOk));
        let h = deliver_when_armed(
            &a,
            RawEvent::new(
                Interface::WiFi,
                WifiFunction::DisconnectedFromAccessPoint.code(),
                StatusCode::CompletedOk,
                DisconnectEventData {
                    ssid: Ssid::try_from("HomeWiFi").unwrap(),
                    bssid: [0; 6],
                    reason: 8,
                }
                .to_vec()
                .unwrap(),
            ),
        );
        assert!(a.disconnect(None).unwrap().is_success());
        h.join().unwrap();
        assert!(!a.is_connected());
        assert!(sink.events().contains(&NetworkEvent::Disconnected {
            interface: Interface::WiFi,
            reason: 8
        }));
    }

    #[test]
    fn antenna_roundtrip_updates_state() {
        let (a, sim, _) = adapter(50);
        sim.on_command(
            Interface::WiFi,
            WifiFunction::GetAntenna.code(),
            crate::adapters::sim::Reply::ok().with_result(
                AntennaResponse {
                    antenna: Antenna::External,
                }
                .to_vec()
                .unwrap(),
            ),
        );
        assert_eq!(a.antenna(), Ok(Antenna::External));
        assert_eq!(a.state().antenna, Some(Antenna::External));
        assert_eq!(a.set_antenna(Antenna::OnBoard, true), Ok(StatusCode::CompletedOk));
        assert_eq!(a.state().antenna, Some(Antenna::OnBoard));
    }

    #[test]
    fn failed_query_surfaces_status() {
        let (a, sim, _) = adapter(50);
        sim.on_command(
            Interface::WiFi,
            WifiFunction::GetMacAddress.code(),
            crate::adapters::sim::Reply::status(StatusCode::NotStarted),
        );
        assert_eq!(
            a.mac_address(),
            Err(ChannelError::Status(StatusCode::NotStarted))
        );
    }

    #[test]
    fn rejected_connect_leaves_in_flight_state_alone() {
        let (a, sim, _) = adapter(300);
        a.handle_event(&connected_event(StatusCode::CompletedOk));
        let pending = {
            let a = a.clone();
            thread::spawn(move || a.disconnect(None))
        };
        while lock(&a.attempt).is_none() {
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(a.connect("Other", "", None), Err(ConnectivityError::AttemptInProgress));
        assert!(a.is_connected());
        assert_eq!(a.state().ssid.as_str(), "HomeWiFi");
        assert_eq!(a.state().ip.ip, Ipv4Addr::new(192, 168, 1, 20));
        assert!(sim
            .commands_for(Interface::WiFi, WifiFunction::ConnectToAccessPoint.code())
            .is_empty());

        assert_eq!(pending.join().unwrap().unwrap().status, ConnectionStatus::Timeout);
    }

    #[test]
    fn success_reports_fields_captured_with_the_confirmation() {
        let (a, _, _) = adapter(2_000);
        let link_lost = RawEvent::new(
            Interface::WiFi,
            WifiFunction::DisconnectedFromAccessPoint.code(),
            StatusCode::CompletedOk,
            Vec::new(),
        );
        for _ in 0..50 {
            let h = {
                let a = a.clone();
                let link_lost = link_lost.clone();
                thread::spawn(move || {
                    while lock(&a.attempt).is_none() {
                        thread::sleep(Duration::from_millis(1));
                    }
                    a.handle_event(&connected_event(StatusCode::CompletedOk));
                    a.handle_event(&link_lost);
                })
            };
            let r = a.connect("HomeWiFi", "mysecret8", None).unwrap();
            h.join().unwrap();

            assert_eq!(r.status, ConnectionStatus::Success);
            let net = r.network.unwrap();
            assert_eq!(net.ip.ip, Ipv4Addr::new(192, 168, 1, 20));
            assert_eq!(net.ip.gateway, Ipv4Addr::new(192, 168, 1, 1));
            assert_eq!(net.ssid.as_str(), "HomeWiFi");
            assert_eq!(net.bssid, [1, 2, 3, 4, 5, 6]);
            assert_eq!(net.channel, 6);
            assert!(!a.is_connected());
        }
    }

    #[test]
    fn confirmation_after_timeout_satisfies_the_next_attempt() {
        let (a, _, _) = adapter(100);
        assert_eq!(
            a.connect("HomeWiFi", "mysecret8", None).unwrap().status,
            ConnectionStatus::Timeout
        );

        // The first attempt's confirmation shows up while the retry waits.
        let h = deliver_when_armed(&a, connected_event(StatusCode::CompletedOk));
        let r = a.connect("HomeWiFi", "mysecret8", None).unwrap();
        h.join().unwrap();
        assert!(r.is_success());
        assert_eq!(r.network.unwrap().ssid.as_str(), "HomeWiFi");
        assert!(lock(&a.attempt).is_none());
    }

    #[test]
    fn status_mapping_has_default_arm() {
        assert_eq!(
            map_status(StatusCode::Unknown(999)),
            ConnectionStatus::Unspecified(StatusCode::Unknown(999))
        );
        assert_eq!(
            map_status(StatusCode::AccessPointNotFound),
            ConnectionStatus::NetworkNotFound
        );
    }
}
