//! Connection and radio power states.
//!
//! Both enums mirror what the radio stack reports. The registry never
//! invents a state on its own; it only compares the reported value against
//! the last one it broadcast.

/// Connection state of a peripheral as reported by the radio adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// Not connected to the peripheral.
    #[default]
    Disconnected,
    /// Currently attempting to connect.
    Connecting,
    /// Connected to the peripheral.
    Connected,
    /// Currently disconnecting.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }

    /// Whether a connect request is accepted from this state.
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Disconnecting)
    }

    /// Whether the adapter holds (or is acquiring) a link in this state.
    pub fn holds_link(&self) -> bool {
        matches!(self, Self::Connected | Self::Connecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Power and availability state of the local radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadioState {
    /// State not yet known. Adapters also report this for values they
    /// cannot map.
    #[default]
    Unknown,
    /// The radio stack is restarting.
    Resetting,
    /// This platform has no BLE support.
    Unsupported,
    /// The process is not permitted to use Bluetooth.
    Unauthorized,
    /// Bluetooth is switched off.
    PoweredOff,
    /// Bluetooth is on and ready.
    PoweredOn,
}

impl RadioState {
    /// Check if the radio can scan and connect.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::PoweredOn)
    }

    /// Human-readable description for status displays.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown Bluetooth State",
            Self::Resetting => "Bluetooth Resetting...",
            Self::Unsupported => "Bluetooth Unsupported",
            Self::Unauthorized => "Bluetooth Unauthorized",
            Self::PoweredOff => "Bluetooth Powered Off",
            Self::PoweredOn => "Bluetooth Powered On",
        }
    }
}

impl std::fmt::Display for RadioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Resetting => write!(f, "Resetting"),
            Self::Unsupported => write!(f, "Unsupported"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::PoweredOff => write!(f, "PoweredOff"),
            Self::PoweredOn => write!(f, "PoweredOn"),
        }
    }
}
