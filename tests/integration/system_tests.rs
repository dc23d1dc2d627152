//! System interface end to end: start notice, error reports, device
//! information query.

use esp32_coproc::adapters::sim::{Reply, SimCoprocessor, SimEvent};
use esp32_coproc::app::events::NetworkEvent;
use esp32_coproc::proto::messages::{DeviceInformation, ErrorEventData};
use esp32_coproc::proto::types::SystemFunction;
use esp32_coproc::proto::{Interface, StatusCode, WireRecord};
use esp32_coproc::CoprocConfig;

use crate::harness::{start, start_with, wait_for};

#[test]
fn start_notice_queued_before_bring_up_is_seen() {
    let sim = SimCoprocessor::new();
    sim.raise_simple(
        Interface::System,
        SystemFunction::CoprocessorStarted.code(),
        StatusCode::CompletedOk,
    );
    let rig = start_with(CoprocConfig::default(), sim);

    assert!(wait_for(|| !rig.sink.events().is_empty()));
    assert!(rig.coproc.system().coprocessor_started());
    assert_eq!(rig.sink.events(), vec![NetworkEvent::CoprocessorStarted]);
}

#[test]
fn error_report_is_forwarded() {
    let rig = start();
    let report = ErrorEventData {
        code: 0x101,
        message: "wifi driver reset".into(),
    };
    rig.sim.raise(
        SimEvent::new(
            Interface::System,
            SystemFunction::ErrorReported.code(),
            StatusCode::Failure,
        )
        .with_payload(report.to_vec().unwrap()),
    );

    assert!(wait_for(|| rig.coproc.system().last_error().is_some()));
    assert_eq!(rig.coproc.system().last_error(), Some(report));
    assert_eq!(
        rig.sink.events(),
        vec![NetworkEvent::CoprocessorError {
            code: 0x101,
            message: "wifi driver reset".into(),
        }]
    );
}

#[test]
fn device_information_round_trips_through_channel() {
    let rig = start();
    let info = DeviceInformation {
        firmware_version: "3.0.1".into(),
        idf_version: "v5.3".into(),
        board: "esp32-s3".into(),
        wifi_mac: [0x24, 0x0A, 0xC4, 0, 0, 1],
        ethernet_mac: [0x24, 0x0A, 0xC4, 0, 0, 2],
    };
    rig.sim.on_command(
        Interface::System,
        SystemFunction::GetDeviceInformation.code(),
        Reply::ok().with_result(info.to_vec().unwrap()),
    );

    assert_eq!(rig.coproc.system().device_information(), Ok(info));
}

#[test]
fn failed_query_surfaces_status() {
    let rig = start();
    rig.sim.on_command(
        Interface::System,
        SystemFunction::GetDeviceInformation.code(),
        Reply::status(StatusCode::Busy),
    );
    assert!(rig.coproc.system().device_information().is_err());
}
