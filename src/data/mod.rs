//! Data structures for device state.
//!
//! This module contains the discovered GATT topology and the read-only
//! snapshots the registry hands out.

pub mod snapshot;
pub mod topology;

pub use snapshot::DeviceSnapshot;
pub use topology::{ServiceEntry, Topology};
