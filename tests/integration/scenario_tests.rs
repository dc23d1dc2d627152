//! Protocol-level scenarios with the bare proto stack (no adapters):
//! the channel, dispatcher and pump wired by hand around the simulator.

use std::sync::Arc;

use esp32_coproc::adapters::sim::{SimCoprocessor, SimEvent};
use esp32_coproc::logging::Logger;
use esp32_coproc::proto::codec::{EventHeader, MAX_PAYLOAD};
use esp32_coproc::proto::{CommandChannel, Dispatcher, EventPump, Interface, StatusCode};

use crate::harness::{Collected, wait_for};

struct Stack {
    sim: Arc<SimCoprocessor>,
    dispatcher: Arc<Dispatcher>,
    pump: EventPump,
}

fn stack(setup: impl FnOnce(&Dispatcher)) -> Stack {
    let sim = SimCoprocessor::new();
    let log = Logger::off("scenario");
    let channel = Arc::new(CommandChannel::new(sim.clone(), MAX_PAYLOAD, log));
    let dispatcher = Arc::new(Dispatcher::new(&[Interface::Ethernet], log).unwrap());
    setup(&dispatcher);
    let pump = EventPump::spawn(sim.clone(), channel, dispatcher.clone(), log).unwrap();
    Stack {
        sim,
        dispatcher,
        pump,
    }
}

#[test]
fn simple_system_event() {
    let seen = Collected::default();
    let s = stack(|d| {
        d.register(Interface::System, seen.handler()).unwrap();
    });

    s.sim.push_record(
        EventHeader {
            interface: Interface::System.code(),
            function: 5,
            status: StatusCode::CompletedOk,
            message_id: 0,
        }
        .to_record(),
    );

    assert!(wait_for(|| !seen.events().is_empty()));
    let e = &seen.events()[0];
    assert_eq!(
        (e.interface, e.function, e.status),
        (Interface::System, 5, StatusCode::CompletedOk)
    );
    assert!(e.payload.is_empty());
    assert_eq!(s.sim.fetch_count(), 0);
}

#[test]
fn complex_wifi_event() {
    let seen = Collected::default();
    let s = stack(|d| {
        d.register(Interface::WiFi, seen.handler()).unwrap();
    });

    let payload = b"twelve bytes".to_vec();
    s.sim.set_payload(77, payload.clone());
    s.sim.push_record(
        EventHeader {
            interface: Interface::WiFi.code(),
            function: 2,
            status: StatusCode::CompletedOk,
            message_id: 77,
        }
        .to_record(),
    );

    assert!(wait_for(|| !seen.events().is_empty()));
    assert_eq!(seen.events()[0].payload, payload);
    assert_eq!(s.sim.fetch_count(), 1);
}

#[test]
fn every_record_delivered_once_with_exact_fields() {
    let wifi = Collected::default();
    let system = Collected::default();
    let s = stack(|d| {
        d.register(Interface::WiFi, wifi.handler()).unwrap();
        d.register(Interface::System, system.handler()).unwrap();
    });

    let mut expected_wifi = Vec::new();
    let mut expected_system = Vec::new();
    for i in 0..60u32 {
        let (iface, expected) = if i % 3 == 0 {
            (Interface::System, &mut expected_system)
        } else {
            (Interface::WiFi, &mut expected_wifi)
        };
        let status = StatusCode::from_code(i % 5);
        let payload = if i % 2 == 0 { vec![i as u8; (i as usize) + 1] } else { Vec::new() };
        s.sim
            .raise(SimEvent::new(iface, i, status).with_payload(payload.clone()));
        expected.push((i, status, payload));
    }

    let total = expected_wifi.len() + expected_system.len();
    assert!(wait_for(|| wifi.events().len() + system.events().len() == total));
    assert_eq!(s.pump.stats().records, total as u64);

    let fields = |c: &Collected| -> Vec<_> {
        c.events()
            .into_iter()
            .map(|e| (e.function, e.status, e.payload))
            .collect()
    };
    assert_eq!(fields(&wifi), expected_wifi);
    assert_eq!(fields(&system), expected_system);
}

#[test]
fn ethernet_buffer_replays_exactly_once() {
    let s = stack(|_| {});
    for f in 0..5 {
        s.sim
            .raise_simple(Interface::Ethernet, f, StatusCode::CompletedOk);
    }
    assert!(wait_for(|| s.dispatcher.pending_len(Interface::Ethernet) == 5));

    let seen = Collected::default();
    assert_eq!(s.dispatcher.register(Interface::Ethernet, seen.handler()), Ok(5));
    for f in 5..8 {
        s.sim
            .raise_simple(Interface::Ethernet, f, StatusCode::CompletedOk);
    }

    assert!(wait_for(|| seen.functions().len() == 8));
    assert_eq!(seen.functions(), (0..8).collect::<Vec<_>>());
    assert_eq!(s.dispatcher.pending_len(Interface::Ethernet), 0);
}
