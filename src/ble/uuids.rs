//! Well-known Bluetooth SIG service UUIDs.
//!
//! Used to give discovered services a readable label. Anything not in this
//! table is shown by UUID alone.

use uuid::Uuid;

/// Base UUID that 16-bit SIG-assigned numbers expand into.
pub const BLUETOOTH_BASE_UUID: Uuid = Uuid::from_u128(0x0000_0000_0000_1000_8000_00805f9b34fb);

/// Generic Access service UUID.
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1800_0000_1000_8000_00805f9b34fb);
/// Generic Attribute service UUID.
pub const GENERIC_ATTRIBUTE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1801_0000_1000_8000_00805f9b34fb);
/// Device Information service UUID.
pub const DEVICE_INFO_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180a_0000_1000_8000_00805f9b34fb);
/// Heart Rate service UUID.
pub const HEART_RATE_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180d_0000_1000_8000_00805f9b34fb);
/// Battery service UUID.
pub const BATTERY_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180f_0000_1000_8000_00805f9b34fb);
/// Human Interface Device service UUID.
pub const HID_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1812_0000_1000_8000_00805f9b34fb);
/// Environmental Sensing service UUID.
pub const ENVIRONMENTAL_SENSING_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_181a_0000_1000_8000_00805f9b34fb);
/// Nordic UART service UUID (vendor specific but ubiquitous).
pub const NORDIC_UART_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e24dcca9e);

/// Client Characteristic Configuration descriptor UUID.
pub const CLIENT_CHARACTERISTIC_CONFIG_UUID: Uuid =
    Uuid::from_u128(0x0000_2902_0000_1000_8000_00805f9b34fb);

/// Expand a 16-bit SIG assigned number into a full UUID.
pub const fn from_short(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID.as_u128() | ((short as u128) << 96))
}

/// Return the 16-bit assigned number if the UUID is in the SIG base range.
pub fn to_short(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let mask: u128 = !(0xffff_u128 << 96);
    if value & mask == BLUETOOTH_BASE_UUID.as_u128() {
        Some((value >> 96) as u16)
    } else {
        None
    }
}

/// Readable name for a well-known service, if known.
pub fn service_name(uuid: &Uuid) -> Option<&'static str> {
    let name = match *uuid {
        GENERIC_ACCESS_SERVICE_UUID => "Generic Access",
        GENERIC_ATTRIBUTE_SERVICE_UUID => "Generic Attribute",
        DEVICE_INFO_SERVICE_UUID => "Device Information",
        HEART_RATE_SERVICE_UUID => "Heart Rate",
        BATTERY_SERVICE_UUID => "Battery",
        HID_SERVICE_UUID => "Human Interface Device",
        ENVIRONMENTAL_SENSING_SERVICE_UUID => "Environmental Sensing",
        NORDIC_UART_SERVICE_UUID => "Nordic UART",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            BATTERY_SERVICE_UUID.to_string(),
            "0000180f-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_short_uuid_expansion() {
        assert_eq!(from_short(0x180f), BATTERY_SERVICE_UUID);
        assert_eq!(from_short(0x2902), CLIENT_CHARACTERISTIC_CONFIG_UUID);
        assert_eq!(to_short(&HEART_RATE_SERVICE_UUID), Some(0x180d));
        assert_eq!(to_short(&NORDIC_UART_SERVICE_UUID), None);
    }

    #[test]
    fn test_service_name() {
        assert_eq!(service_name(&BATTERY_SERVICE_UUID), Some("Battery"));
        assert_eq!(service_name(&NORDIC_UART_SERVICE_UUID), Some("Nordic UART"));
        assert_eq!(service_name(&Uuid::from_u128(42)), None);
    }
}
