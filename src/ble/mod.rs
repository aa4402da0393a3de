//! BLE communication module.
//!
//! This module holds the radio adapter boundary, its btleplug and
//! simulated implementations, and the identifier and state types shared
//! with the rest of the crate.

pub mod adapter;
pub mod btleplug_adapter;
pub mod connection;
pub mod ids;
pub mod simulated;
pub mod uuids;

pub use adapter::{AdapterEvent, Advertisement, EventSink, RadioAdapter};
pub use btleplug_adapter::BtleplugAdapter;
pub use connection::{ConnectionState, RadioState};
pub use ids::{CharacteristicId, DescriptorId, DeviceId, ServiceId};
pub use simulated::{AdapterCall, SimulatedAdapter};
pub use uuids::*;
