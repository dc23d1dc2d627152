//! Event pump: simple vs complex records, payload fetch, queue errors.

use esp32_coproc::adapters::sim::SimEvent;
use esp32_coproc::app::events::NetworkEvent;
use esp32_coproc::proto::codec::EventHeader;
use esp32_coproc::proto::{Interface, StatusCode};

use crate::harness::{Collected, start, wait_for};

// ── Simple events carry no payload and cost no fetch ─────────

#[test]
fn simple_event_is_dispatched_without_fetch() {
    let rig = start();
    let seen = Collected::default();
    rig.coproc
        .register_handler(Interface::Bluetooth, seen.handler())
        .unwrap();

    rig.sim
        .raise_simple(Interface::Bluetooth, 5, StatusCode::CompletedOk);

    assert!(wait_for(|| !seen.events().is_empty()));
    let e = &seen.events()[0];
    assert_eq!(e.function, 5);
    assert_eq!(e.status, StatusCode::CompletedOk);
    assert!(e.payload.is_empty());
    assert_eq!(rig.sim.fetch_count(), 0);
    assert_eq!(rig.coproc.pump_stats().simple, 1);
}

// ── Complex events are joined with their fetched payload ─────

#[test]
fn complex_event_payload_is_fetched_by_message_id() {
    let rig = start();
    let seen = Collected::default();
    rig.coproc
        .register_handler(Interface::Cellular, seen.handler())
        .unwrap();

    let payload: Vec<u8> = (1..=12).collect();
    rig.sim.set_payload(77, payload.clone());
    rig.sim.push_record(
        EventHeader {
            interface: Interface::Cellular.code(),
            function: 2,
            status: StatusCode::CompletedOk,
            message_id: 77,
        }
        .to_record(),
    );

    assert!(wait_for(|| !seen.events().is_empty()));
    assert_eq!(seen.events()[0].payload, payload);
    assert_eq!(rig.sim.fetch_count(), 1);
    let stats = rig.coproc.pump_stats();
    assert_eq!((stats.complex, stats.fetch_failures), (1, 0));
}

#[test]
fn missing_payload_is_dispatched_empty() {
    let rig = start();
    let seen = Collected::default();
    rig.coproc
        .register_handler(Interface::Cellular, seen.handler())
        .unwrap();

    // No payload stored under this id.
    rig.sim.push_record(
        EventHeader {
            interface: Interface::Cellular.code(),
            function: 3,
            status: StatusCode::Failure,
            message_id: 999,
        }
        .to_record(),
    );

    assert!(wait_for(|| !seen.events().is_empty()));
    assert!(seen.events()[0].payload.is_empty());
    assert_eq!(rig.coproc.pump_stats().fetch_failures, 1);
    assert!(rig.coproc.pump_running());
}

#[test]
fn payload_survives_at_transport_ceiling() {
    let rig = start();
    let seen = Collected::default();
    rig.coproc
        .register_handler(Interface::Transport, seen.handler())
        .unwrap();

    let big: Vec<u8> = (0..4000u32).map(|i| (i % 251) as u8).collect();
    rig.sim.raise(
        SimEvent::new(Interface::Transport, 9, StatusCode::CompletedOk).with_payload(big.clone()),
    );

    assert!(wait_for(|| !seen.events().is_empty()));
    assert_eq!(seen.events()[0].payload, big);
}

// ── Unknown interfaces and interrupted reads ─────────────────

#[test]
fn unknown_interface_is_counted_and_skipped() {
    let rig = start();
    let seen = Collected::default();
    rig.coproc
        .register_handler(Interface::Bluetooth, seen.handler())
        .unwrap();

    rig.sim.push_record(
        EventHeader {
            interface: 9,
            function: 1,
            status: StatusCode::CompletedOk,
            message_id: 0,
        }
        .to_record(),
    );
    rig.sim
        .raise_simple(Interface::Bluetooth, 1, StatusCode::CompletedOk);

    assert!(wait_for(|| !seen.events().is_empty()));
    assert_eq!(rig.coproc.pump_stats().unknown_interface, 1);
    assert_eq!(seen.functions(), vec![1]);
}

#[test]
fn interrupted_reads_are_retried() {
    let rig = start();
    let seen = Collected::default();
    rig.coproc
        .register_handler(Interface::Bluetooth, seen.handler())
        .unwrap();

    rig.sim.interrupt_next_reads(3);
    rig.sim
        .raise_simple(Interface::Bluetooth, 4, StatusCode::CompletedOk);

    assert!(wait_for(|| !seen.events().is_empty()));
    assert!(rig.coproc.pump_running());
    assert_eq!(rig.coproc.pump_stats().interrupted, 3);
}

// ── Fatal queue error ────────────────────────────────────────

#[test]
fn fatal_read_error_stops_pump_and_notifies() {
    let rig = start();
    rig.sim.fail_reads(5);

    let expected = NetworkEvent::PumpFailed {
        code: 5,
        message: "OS error 5".into(),
    };
    assert!(wait_for(|| !rig.coproc.pump_running()));
    assert!(wait_for(|| rig.sink.events().contains(&expected)));
    assert!(rig.coproc.system().pump_failed());
    assert!(wait_for(|| rig.coproc.system().last_error().map(|e| e.code) == Some(5)));
}

#[test]
fn events_before_fatal_error_are_still_delivered() {
    let rig = start();
    let seen = Collected::default();
    rig.coproc
        .register_handler(Interface::Bluetooth, seen.handler())
        .unwrap();

    for f in 0..5 {
        rig.sim
            .raise_simple(Interface::Bluetooth, f, StatusCode::CompletedOk);
    }
    assert!(wait_for(|| rig.coproc.pump_stats().records == 5));
    rig.sim.fail_reads(9);

    assert!(wait_for(|| !rig.coproc.pump_running()));
    assert!(wait_for(|| seen.functions().len() == 5));
    assert_eq!(seen.functions(), vec![0, 1, 2, 3, 4]);
}
