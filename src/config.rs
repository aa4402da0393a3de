//! Registry configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default silence after which a disconnected device is dropped.
pub const DEFAULT_LOST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time a connection attempt may stay pending.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default RSSI read period while a link is held.
pub const DEFAULT_SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default expiry sweep period.
pub const DEFAULT_EXPIRY_INTERVAL: Duration = Duration::from_millis(500);

/// Default name for devices that have not advertised one.
pub const DEFAULT_PLACEHOLDER_NAME: &str = "unknown";

/// Tunables for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegistryConfig {
    /// A disconnected device silent for longer than this is removed.
    pub lost_timeout: Duration,
    /// A device still connecting after this long is force-disconnected.
    pub connect_timeout: Duration,
    /// RSSI read period while connecting or connected.
    pub signal_poll_interval: Duration,
    /// Expiry sweep period.
    pub expiry_interval: Duration,
    /// Ask the radio to report every advertisement, not just the first.
    pub allow_duplicates: bool,
    /// Connect to each newly sighted device.
    pub auto_connect: bool,
    /// Leave placeholder-named devices out of device listings.
    pub named_only: bool,
    /// Name reported for devices without one.
    pub placeholder_name: String,
    /// Per-subscriber notification buffer.
    pub notification_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lost_timeout: DEFAULT_LOST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            signal_poll_interval: DEFAULT_SIGNAL_POLL_INTERVAL,
            expiry_interval: DEFAULT_EXPIRY_INTERVAL,
            allow_duplicates: true,
            auto_connect: false,
            named_only: false,
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
            notification_capacity: 256,
        }
    }
}

impl RegistryConfig {
    /// Set the lost-device timeout.
    pub fn with_lost_timeout(mut self, timeout: Duration) -> Self {
        self.lost_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the RSSI poll interval.
    pub fn with_signal_poll_interval(mut self, interval: Duration) -> Self {
        self.signal_poll_interval = interval;
        self
    }

    /// Set the expiry sweep interval.
    pub fn with_expiry_interval(mut self, interval: Duration) -> Self {
        self.expiry_interval = interval;
        self
    }

    /// Enable or disable automatic connection to new devices.
    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    /// Only list devices that have a real name.
    pub fn with_named_only(mut self, named_only: bool) -> Self {
        self.named_only = named_only;
        self
    }

    /// Set the placeholder name.
    pub fn with_placeholder_name(mut self, name: impl Into<String>) -> Self {
        self.placeholder_name = name.into();
        self
    }

    /// Set the notification buffer size.
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Check that every interval is non-zero and the buffer can hold a
    /// notification.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("lost_timeout", self.lost_timeout),
            ("connect_timeout", self.connect_timeout),
            ("signal_poll_interval", self.signal_poll_interval),
            ("expiry_interval", self.expiry_interval),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(Error::InvalidParameter {
                    name: name.to_string(),
                    value: format!("{:?}", value),
                });
            }
        }

        if self.notification_capacity == 0 {
            return Err(Error::InvalidParameter {
                name: "notification_capacity".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}
