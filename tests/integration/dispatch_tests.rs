//! Dispatch lanes: ordering, isolation between interfaces, and the
//! pending-subscriber buffer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use esp32_coproc::adapters::sim::{SimCoprocessor, SimEvent};
use esp32_coproc::app::events::NetworkEvent;
use esp32_coproc::proto::messages::EthernetEventData;
use esp32_coproc::proto::types::EthernetFunction;
use esp32_coproc::proto::{Interface, RawEvent, StatusCode, WireRecord};
use esp32_coproc::CoprocConfig;

use crate::harness::{Collected, start, start_with, wait_for};

// ── Ordering ─────────────────────────────────────────────────

#[test]
fn events_arrive_in_queue_order_exactly_once() {
    let rig = start();
    let seen = Collected::default();
    rig.coproc
        .register_handler(Interface::Bluetooth, seen.handler())
        .unwrap();

    for f in 0..200 {
        rig.sim
            .raise_simple(Interface::Bluetooth, f, StatusCode::CompletedOk);
    }

    assert!(wait_for(|| seen.functions().len() >= 200));
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(seen.functions(), (0..200).collect::<Vec<_>>());
}

#[test]
fn slow_interface_does_not_hold_up_others() {
    let rig = start();
    let release = Arc::new(AtomicBool::new(false));
    let gate = release.clone();
    rig.coproc
        .register_handler(Interface::Cellular, move |_: &RawEvent| {
            while !gate.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();
    let fast = Collected::default();
    rig.coproc
        .register_handler(Interface::Bluetooth, fast.handler())
        .unwrap();

    rig.sim
        .raise_simple(Interface::Cellular, 1, StatusCode::CompletedOk);
    for f in 0..10 {
        rig.sim
            .raise_simple(Interface::Bluetooth, f, StatusCode::CompletedOk);
    }

    assert!(wait_for(|| fast.functions().len() == 10));
    release.store(true, Ordering::Release);
}

#[test]
fn panicking_handler_keeps_its_lane_alive() {
    let rig = start();
    let seen = Collected::default();
    let mut inner = seen.handler();
    rig.coproc
        .register_handler(Interface::Transport, move |e: &RawEvent| {
            assert!(e.function != 13, "handler blew up");
            inner(e);
        })
        .unwrap();

    for f in [12, 13, 14] {
        rig.sim
            .raise_simple(Interface::Transport, f, StatusCode::CompletedOk);
    }

    assert!(wait_for(|| seen.functions().len() == 2));
    assert_eq!(seen.functions(), vec![12, 14]);
}

// ── Pending-subscriber buffer ────────────────────────────────

fn link_up() -> SimEvent {
    let data = EthernetEventData {
        ip: [10, 0, 0, 42].into(),
        netmask: [255, 255, 255, 0].into(),
        gateway: [10, 0, 0, 1].into(),
        mac: [0x02, 0, 0, 0, 0, 0x2A],
    };
    SimEvent::new(
        Interface::Ethernet,
        EthernetFunction::Connected.code(),
        StatusCode::CompletedOk,
    )
    .with_payload(data.to_vec().unwrap())
}

#[test]
fn ethernet_events_before_attach_are_replayed() {
    let sim = SimCoprocessor::new();
    sim.raise_simple(
        Interface::Ethernet,
        EthernetFunction::InterfaceStarted.code(),
        StatusCode::CompletedOk,
    );
    sim.raise(link_up());
    let rig = start_with(CoprocConfig::default(), sim);

    assert!(wait_for(|| rig.coproc.pending_events(Interface::Ethernet) == 2));
    assert!(rig.sink.events().is_empty());

    let eth = rig.coproc.ethernet().unwrap();
    assert_eq!(rig.coproc.pending_events(Interface::Ethernet), 0);

    assert!(wait_for(|| eth.is_connected()));
    let state = eth.state();
    assert!(state.started);
    assert_eq!(state.ip.ip, std::net::Ipv4Addr::new(10, 0, 0, 42));
    assert_eq!(
        rig.sink.events()[0],
        NetworkEvent::InterfaceStarted(Interface::Ethernet)
    );
}

#[test]
fn replay_precedes_live_events() {
    let config = CoprocConfig {
        buffered_interfaces: vec![Interface::Ethernet, Interface::Transport],
        ..Default::default()
    };
    let rig = start_with(config, SimCoprocessor::new());
    for f in 0..3 {
        rig.sim
            .raise_simple(Interface::Transport, f, StatusCode::CompletedOk);
    }
    assert!(wait_for(|| rig.coproc.pending_events(Interface::Transport) == 3));

    let seen = Collected::default();
    assert_eq!(
        rig.coproc.register_handler(Interface::Transport, seen.handler()),
        Ok(3)
    );
    for f in 3..6 {
        rig.sim
            .raise_simple(Interface::Transport, f, StatusCode::CompletedOk);
    }

    assert!(wait_for(|| seen.functions().len() == 6));
    assert_eq!(seen.functions(), (0..6).collect::<Vec<_>>());
}

#[test]
fn unbuffered_interface_drops_events_without_handler() {
    let rig = start();
    for f in 0..4 {
        rig.sim
            .raise_simple(Interface::Cellular, f, StatusCode::CompletedOk);
    }
    assert!(wait_for(|| rig.coproc.pump_stats().records == 4));
    // Let the lane drain what the pump handed it.
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(rig.coproc.pending_events(Interface::Cellular), 0);

    let seen = Collected::default();
    assert_eq!(
        rig.coproc.register_handler(Interface::Cellular, seen.handler()),
        Ok(0)
    );
    rig.sim
        .raise_simple(Interface::Cellular, 10, StatusCode::CompletedOk);
    assert!(wait_for(|| !seen.functions().is_empty()));
    assert_eq!(seen.functions(), vec![10]);
}
