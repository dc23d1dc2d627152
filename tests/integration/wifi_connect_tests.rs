//! WiFi connect/disconnect through the full stack: command accepted,
//! confirmation raised as an event, pump and lane resolve the waiting
//! caller.

use std::net::Ipv4Addr;
use std::thread;
use std::time::{Duration, Instant};

use esp32_coproc::adapters::sim::{Reply, SimCoprocessor, SimEvent};
use esp32_coproc::adapters::wifi::{ConnectionStatus, ConnectivityError};
use esp32_coproc::app::events::NetworkEvent;
use esp32_coproc::proto::messages::{
    ConnectEventData, ConnectRequest, DisconnectEventData, Ssid,
};
use esp32_coproc::proto::types::WifiFunction;
use esp32_coproc::proto::{CancelToken, Interface, StatusCode, WireRecord};
use esp32_coproc::CoprocConfig;

use crate::harness::{Rig, start, start_with, wait_for};

const CONNECT: u32 = WifiFunction::ConnectToAccessPoint.code();
const DISCONNECT: u32 = WifiFunction::DisconnectFromAccessPoint.code();

fn with_timeout(ms: u32) -> Rig {
    let config = CoprocConfig {
        connect_timeout_ms: ms,
        ..Default::default()
    };
    start_with(config, SimCoprocessor::new())
}

fn connected(ssid: &str) -> SimEvent {
    let data = ConnectEventData {
        ip: Ipv4Addr::new(192, 168, 50, 10),
        netmask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::new(192, 168, 50, 1),
        ssid: Ssid::try_from(ssid).unwrap(),
        bssid: [0xAA, 0xBB, 0xCC, 0x00, 0x11, 0x22],
        channel: 1,
        auth_mode: 3,
    };
    SimEvent::new(
        Interface::WiFi,
        WifiFunction::ConnectedToAccessPoint.code(),
        StatusCode::CompletedOk,
    )
    .with_payload(data.to_vec().unwrap())
}

fn disconnected(status: StatusCode, reason: u8) -> SimEvent {
    let data = DisconnectEventData {
        ssid: Ssid::try_from("Attic").unwrap(),
        bssid: [0; 6],
        reason,
    };
    SimEvent::new(
        Interface::WiFi,
        WifiFunction::DisconnectedFromAccessPoint.code(),
        status,
    )
    .with_payload(data.to_vec().unwrap())
}

// ── Success ──────────────────────────────────────────────────

#[test]
fn connect_resolves_from_confirmation_event() {
    let rig = start();
    rig.sim
        .on_command(Interface::WiFi, CONNECT, Reply::ok().then(connected("Attic")));

    let result = rig.coproc.wifi().connect("Attic", "hunter2hunter2", None).unwrap();

    assert_eq!(result.status, ConnectionStatus::Success);
    let net = result.network.unwrap();
    assert_eq!(net.ip.ip, Ipv4Addr::new(192, 168, 50, 10));
    assert_eq!(net.ip.gateway, Ipv4Addr::new(192, 168, 50, 1));
    assert_eq!(net.ssid.as_str(), "Attic");
    assert!(rig.coproc.wifi().is_connected());

    let sent = rig.sim.commands_for(Interface::WiFi, CONNECT);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].blocking);
    let req = ConnectRequest::from_bytes(&sent[0].payload).unwrap();
    assert_eq!(req.ssid.as_str(), "Attic");
    assert!(req.reconnect);

    assert!(wait_for(|| rig
        .sink
        .events()
        .iter()
        .any(|e| matches!(e, NetworkEvent::Connected { interface: Interface::WiFi, .. }))));
}

#[test]
fn disconnect_waits_for_confirmation() {
    let rig = start();
    rig.sim
        .on_command(Interface::WiFi, CONNECT, Reply::ok().then(connected("Attic")));
    rig.sim.on_command(
        Interface::WiFi,
        DISCONNECT,
        Reply::ok().then(disconnected(StatusCode::CompletedOk, 8)),
    );
    let wifi = rig.coproc.wifi();
    assert!(wifi.connect("Attic", "hunter2hunter2", None).unwrap().is_success());

    let result = wifi.disconnect(None).unwrap();
    assert_eq!(result.status, ConnectionStatus::Success);
    assert!(!wifi.is_connected());
    assert!(wait_for(|| rig.sink.events().contains(&NetworkEvent::Disconnected {
        interface: Interface::WiFi,
        reason: 8,
    })));
}

// ── Failures ─────────────────────────────────────────────────

#[test]
fn refused_credentials_reported_as_auth_failure() {
    let rig = start();
    rig.sim.on_command(
        Interface::WiFi,
        CONNECT,
        Reply::ok().then(disconnected(StatusCode::AuthenticationFailed, 15)),
    );

    let result = rig.coproc.wifi().connect("Attic", "not-the-key", None).unwrap();

    assert_eq!(result.status, ConnectionStatus::AuthenticationRefused);
    assert!(result.network.is_none());
    assert!(!rig.coproc.wifi().is_connected());
}

#[test]
fn rejected_command_returns_without_waiting() {
    let rig = with_timeout(60_000);
    rig.sim
        .on_command(Interface::WiFi, CONNECT, Reply::status(StatusCode::AccessPointNotFound));

    let start = Instant::now();
    let result = rig.coproc.wifi().connect("Nowhere", "", None).unwrap();

    assert_eq!(result.status, ConnectionStatus::NetworkNotFound);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn transport_failure_maps_to_unspecified() {
    let rig = start();
    rig.sim
        .on_command(Interface::WiFi, CONNECT, Reply::transport_error(-5));

    let result = rig.coproc.wifi().connect("Attic", "", None).unwrap();
    assert!(matches!(result.status, ConnectionStatus::Unspecified(_)));
}

#[test]
fn invalid_arguments_never_reach_the_coprocessor() {
    let rig = start();
    let wifi = rig.coproc.wifi();
    assert_eq!(wifi.connect("", "password1", None), Err(ConnectivityError::InvalidSsid));
    assert_eq!(
        wifi.connect("Attic", "short", None),
        Err(ConnectivityError::InvalidPassword)
    );
    assert!(rig.sim.commands_for(Interface::WiFi, CONNECT).is_empty());
}

// ── Timeout and cancellation ─────────────────────────────────

#[test]
fn missing_confirmation_times_out() {
    let rig = with_timeout(150);

    let start = Instant::now();
    let result = rig.coproc.wifi().connect("Attic", "hunter2hunter2", None).unwrap();

    assert_eq!(result.status, ConnectionStatus::Timeout);
    assert!(start.elapsed() >= Duration::from_millis(150));
    assert!(result.network.is_none());
}

#[test]
fn late_confirmation_after_timeout_is_harmless() {
    let rig = with_timeout(100);
    let wifi = rig.coproc.wifi();
    assert_eq!(
        wifi.connect("Attic", "hunter2hunter2", None).unwrap().status,
        ConnectionStatus::Timeout
    );

    // The coprocessor finally answers; state follows, no caller is woken.
    rig.sim.raise(connected("Attic"));
    assert!(wait_for(|| wifi.is_connected()));

    // The next attempt is not blocked by the stale one.
    rig.sim
        .on_command(Interface::WiFi, CONNECT, Reply::ok().then(connected("Attic")));
    assert!(wifi.connect("Attic", "hunter2hunter2", None).unwrap().is_success());
}

#[test]
fn cancel_token_aborts_wait() {
    let rig = with_timeout(60_000);
    let token = CancelToken::new();
    let trigger = token.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        trigger.cancel();
    });

    let start = Instant::now();
    let result = rig
        .coproc
        .wifi()
        .connect("Attic", "hunter2hunter2", Some(&token))
        .unwrap();
    canceller.join().unwrap();

    assert_eq!(result.status, ConnectionStatus::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn second_concurrent_connect_is_rejected() {
    let rig = with_timeout(400);
    let wifi = rig.coproc.wifi().clone();
    let first = thread::spawn(move || wifi.connect("Attic", "hunter2hunter2", None));

    assert!(wait_for(|| !rig.sim.commands_for(Interface::WiFi, CONNECT).is_empty()));
    assert_eq!(
        rig.coproc.wifi().connect("Attic", "hunter2hunter2", None),
        Err(ConnectivityError::AttemptInProgress)
    );

    let first = first.join().unwrap().unwrap();
    assert_eq!(first.status, ConnectionStatus::Timeout);
    assert_eq!(rig.sim.commands_for(Interface::WiFi, CONNECT).len(), 1);
}
