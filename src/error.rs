//! Error types for the ble-device-registry crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available, not powered on, or not authorized.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// The specified device is not in the registry.
    #[error("Device not found: {identifier}")]
    DeviceNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// A GATT discovery request failed.
    ///
    /// Discovery failures are never fatal; they are carried inside adapter
    /// events so they can be logged next to the partial result.
    #[error("Discovery failed: {context}")]
    DiscoveryFailed {
        /// Description of what could not be discovered.
        context: String,
    },

    /// The radio could not report a signal strength for the device.
    #[error("Signal strength unavailable for {identifier}")]
    SignalUnavailable {
        /// The identifier of the device.
        identifier: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// The registry coordinator has shut down.
    #[error("Registry is shut down")]
    RegistryClosed,
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DeviceNotFound {
            identifier: "AA:BB".to_string(),
        };
        assert_eq!(err.to_string(), "Device not found: AA:BB");

        let err = Error::InvalidParameter {
            name: "expiry_interval".to_string(),
            value: "0ns".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid parameter: expiry_interval = 0ns");
    }
}
