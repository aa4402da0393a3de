//! Utility functions for the ble-device-registry crate.

/// Grade an RSSI reading into 0-5 signal bars.
///
/// # Arguments
///
/// * `rssi` - Received signal strength in dBm
///
/// # Returns
///
/// 5 for -40 dBm and above, down to 0 for anything weaker than -90 dBm.
///
/// # Example
///
/// ```
/// use ble_device_registry::signal_bars;
///
/// assert_eq!(signal_bars(-30), 5);
/// assert_eq!(signal_bars(-75), 2);
/// assert_eq!(signal_bars(-100), 0);
/// ```
pub fn signal_bars(rssi: i16) -> u8 {
    match rssi {
        -40..=0 => 5,
        -67..=-41 => 4,
        -70..=-68 => 3,
        -80..=-71 => 2,
        -90..=-81 => 1,
        _ => 0,
    }
}
