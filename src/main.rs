//! esp32-coproc-sim — drives the full subsystem against the in-process
//! simulated coprocessor.
//!
//! ```text
//!  SimCoprocessor ──▶ EventPump ──▶ Dispatcher ──▶ Wifi / Ethernet / System
//!        ▲                                              │
//!        └──────────── CommandChannel ◀─────────────────┘
//! ```
//!
//! Usage: `esp32-coproc-sim [config.json]`. Verbosity follows `RUST_LOG`.
#![deny(unused_must_use)]

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use esp32_coproc::adapters::log_sink::LogEventSink;
use esp32_coproc::adapters::sim::{Reply, SimCoprocessor, SimEvent};
use esp32_coproc::proto::messages::{
    AccessPoint, AccessPointList, ConnectEventData, DeviceInformation, EthernetEventData,
    ScanRequest, Ssid,
};
use esp32_coproc::proto::types::{EthernetFunction, SystemFunction, WifiFunction};
use esp32_coproc::proto::{Interface, StatusCode, WireRecord};
use esp32_coproc::{Coprocessor, CoprocConfig};

const DEMO_SSID: &str = "Workshop";

// ── Simulator script ──────────────────────────────────────────

fn ssid(s: &str) -> Result<Ssid> {
    Ssid::try_from(s).map_err(|()| anyhow::anyhow!("SSID '{s}' too long"))
}

fn script(sim: &SimCoprocessor) -> Result<()> {
    let info = DeviceInformation {
        firmware_version: "2.1.0".into(),
        idf_version: "v5.2.1".into(),
        board: "esp32-c6-devkit".into(),
        wifi_mac: [0x24, 0x0A, 0xC4, 0x01, 0x02, 0x03],
        ethernet_mac: [0x24, 0x0A, 0xC4, 0x01, 0x02, 0x04],
    };
    sim.on_command(
        Interface::System,
        SystemFunction::GetDeviceInformation.code(),
        Reply::ok().with_result(info.to_vec()?),
    );

    let connected = ConnectEventData {
        ip: Ipv4Addr::new(192, 168, 4, 23),
        netmask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::new(192, 168, 4, 1),
        ssid: ssid(DEMO_SSID)?,
        bssid: [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01],
        channel: 11,
        auth_mode: 3,
    };
    sim.on_command(
        Interface::WiFi,
        WifiFunction::ConnectToAccessPoint.code(),
        Reply::ok().then(
            SimEvent::new(
                Interface::WiFi,
                WifiFunction::ConnectedToAccessPoint.code(),
                StatusCode::CompletedOk,
            )
            .with_payload(connected.to_vec()?),
        ),
    );

    let scan = AccessPointList {
        access_points: vec![
            AccessPoint {
                ssid: ssid(DEMO_SSID)?,
                bssid: [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01],
                channel: 11,
                rssi: -48,
                auth_mode: 3,
            },
            AccessPoint {
                ssid: ssid("Neighbour-5G")?,
                bssid: [0x10, 0x20, 0x30, 0x40, 0x50, 0x60],
                channel: 36,
                rssi: -81,
                auth_mode: 4,
            },
        ],
    };
    sim.on_command(
        Interface::WiFi,
        WifiFunction::Scan.code(),
        Reply::ok().with_result(scan.to_vec()?),
    );

    // Raised before anyone listens: Ethernet events are held for replay.
    sim.raise_simple(
        Interface::System,
        SystemFunction::CoprocessorStarted.code(),
        StatusCode::CompletedOk,
    );
    sim.raise_simple(
        Interface::Ethernet,
        EthernetFunction::InterfaceStarted.code(),
        StatusCode::CompletedOk,
    );
    let link = EthernetEventData {
        ip: Ipv4Addr::new(10, 20, 0, 7),
        netmask: Ipv4Addr::new(255, 255, 0, 0),
        gateway: Ipv4Addr::new(10, 20, 0, 1),
        mac: [0x24, 0x0A, 0xC4, 0x01, 0x02, 0x04],
    };
    sim.raise(
        SimEvent::new(
            Interface::Ethernet,
            EthernetFunction::Connected.code(),
            StatusCode::CompletedOk,
        )
        .with_payload(link.to_vec()?),
    );
    Ok(())
}

fn load_config() -> Result<CoprocConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            Ok(CoprocConfig::from_json(&text)?)
        }
        None => Ok(CoprocConfig::default()),
    }
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while !done() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    true
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("esp32-coproc-sim v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config()?;

    let sim = SimCoprocessor::new();
    script(&sim)?;

    let coproc = Coprocessor::start(config, sim.clone(), Arc::new(LogEventSink::new()))?;

    let info = coproc.system().device_information()?;
    info!(
        "coprocessor firmware {} (IDF {}) on {}",
        info.firmware_version, info.idf_version, info.board
    );

    let result = coproc.wifi().connect(DEMO_SSID, "correct-horse", None)?;
    match &result.network {
        Some(net) if result.is_success() => {
            info!("WiFi up: {} via {} on channel {}", net.ip.ip, net.ip.gateway, net.channel);
        }
        _ => warn!("WiFi connect finished with {:?}", result.status),
    }

    for ap in coproc.wifi().scan(&ScanRequest::default())? {
        info!("  {:<24} ch {:>3}  {:>4} dBm", ap.ssid.as_str(), ap.channel, ap.rssi);
    }

    info!(
        "{} Ethernet events waiting for a subscriber",
        coproc.pending_events(Interface::Ethernet)
    );
    let ethernet = coproc.ethernet()?;
    let eth = ethernet.state();
    info!("Ethernet link_up={} ip={}", eth.link_up, eth.ip.ip);

    sim.close();
    if !wait_until(Duration::from_secs(2), || !coproc.pump_running()) {
        bail!("event pump did not stop after queue close");
    }
    info!(
        "pump stats: {}",
        serde_json::to_string(&coproc.pump_stats())?
    );
    Ok(())
}
