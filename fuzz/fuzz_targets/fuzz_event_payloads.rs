//! Fuzz target: typed event and response payload decoders
//!
//! Feeds arbitrary bytes to every record decoder the event lanes and the
//! command channel use. Decoders must reject bad lengths without
//! panicking or over-reading; anything accepted must re-encode to the
//! same bytes.
//!
//! cargo fuzz run fuzz_event_payloads

#![no_main]

use esp32_coproc::proto::codec::{MAX_PAYLOAD, WireRecord};
use esp32_coproc::proto::messages::{
    AccessPointList, ConnectEventData, DeviceInformation, DisconnectEventData, ErrorEventData,
    EthernetEventData, StationEventData,
};
use libfuzzer_sys::fuzz_target;

fn check<R: WireRecord>(data: &[u8]) {
    if let Ok(record) = R::from_bytes(data) {
        assert_eq!(record.encoded_len(), data.len(), "accepted record must consume its input");
        if data.len() <= MAX_PAYLOAD {
            assert_eq!(record.to_vec().as_deref(), Ok(data));
        }
    }
}

fuzz_target!(|data: &[u8]| {
    check::<ConnectEventData>(data);
    check::<DisconnectEventData>(data);
    check::<StationEventData>(data);
    check::<EthernetEventData>(data);
    check::<ErrorEventData>(data);
    check::<DeviceInformation>(data);
    check::<AccessPointList>(data);
});
