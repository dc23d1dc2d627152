//! Application-facing layer.
//!
//! [`coprocessor::Coprocessor`] wires the protocol core and the adapters
//! together. Adapters report outward through the port traits in
//! [`ports`] using the notifications in [`events`].

pub mod coprocessor;
pub mod events;
pub mod ports;
