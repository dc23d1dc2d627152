//! Fuzz target: `EventHeader::parse`
//!
//! Any 22-byte queue record must either parse or fail cleanly, and a
//! parsed header must re-encode to the same first 13 bytes.
//!
//! cargo fuzz run fuzz_event_header

#![no_main]

use esp32_coproc::proto::codec::{EVENT_RECORD_SIZE, EventHeader, WireRecord};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary-length input must never panic.
    let _ = EventHeader::from_bytes(data);

    let Ok(record) = <[u8; EVENT_RECORD_SIZE]>::try_from(data) else {
        return;
    };
    let header = EventHeader::parse(&record).expect("every 22-byte record parses");
    let again = header.to_record();
    assert_eq!(&again[..13], &record[..13], "header fields must round-trip");
    assert!(again[13..].iter().all(|b| *b == 0));
});
