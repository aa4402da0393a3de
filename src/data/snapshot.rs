//! Read-only device views handed to consumers.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::ble::connection::ConnectionState;
use crate::ble::ids::DeviceId;
use crate::data::topology::Topology;
use crate::utils::signal_bars;

/// Point-in-time copy of a device's observable state.
///
/// Snapshots are detached from the registry; holding one never blocks or
/// mutates the live device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceSnapshot {
    /// Stable peripheral identifier.
    pub identifier: DeviceId,
    /// Current name, or the configured placeholder.
    pub name: String,
    /// Connection state as reported by the radio.
    pub connection_state: ConnectionState,
    /// Last RSSI reading in dBm.
    pub signal_strength: Option<i16>,
    /// Wall-clock time the device was first sighted.
    pub first_seen: DateTime<Utc>,
    /// Time since the last advertisement or connection activity.
    pub last_seen_ago: Duration,
    /// Discovered GATT layout.
    pub topology: Topology,
}

impl DeviceSnapshot {
    /// Signal quality graded 0 (none) to 5 (excellent).
    pub fn signal_bars(&self) -> u8 {
        self.signal_strength.map(signal_bars).unwrap_or(0)
    }

    /// Check if the device is connected.
    pub fn is_connected(&self) -> bool {
        self.connection_state.is_connected()
    }
}
