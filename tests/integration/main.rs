//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below exercises one part of the subsystem end to end:
//! a [`SimCoprocessor`](esp32_coproc::adapters::sim::SimCoprocessor)
//! behind a fully started `Coprocessor`, with the real event pump and
//! dispatch lanes running. No hardware required.

mod dispatch_tests;
mod harness;
mod pump_tests;
mod scenario_tests;
mod system_tests;
mod wifi_connect_tests;
