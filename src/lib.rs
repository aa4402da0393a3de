// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # ble-device-registry
//!
//! A cross-platform Rust library that keeps a live registry of nearby
//! Bluetooth Low Energy peripherals.
//!
//! The registry scans continuously, tracks each peripheral's connection
//! state and signal strength, walks the GATT table of connected devices and
//! drops devices that go silent while disconnected. Every observable change
//! is announced on a typed notification bus so a UI can re-render.
//!
//! ## Features
//!
//! - **Discovery**: Devices appear on their first advertisement
//! - **Connection Lifecycle**: Connect/disconnect with a connect timeout
//! - **Signal Tracking**: RSSI from advertisements and active polling
//! - **GATT Topology**: Services, characteristics, included services and descriptors
//! - **Expiry**: Silent disconnected devices are removed after a timeout
//! - **Notifications**: Typed change notifications with sender identity
//! - **Simulation**: A scriptable adapter for tests and hardware-free demos
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ble_device_registry::{Registry, RegistryConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Create the registry and start scanning
//!     let registry = Registry::with_btleplug(RegistryConfig::default()).await?;
//!     registry.start().await?;
//!
//!     // Wait for devices to be discovered
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!
//!     // List them in identifier order
//!     for device in registry.devices().await? {
//!         println!(
//!             "{} {} ({} bars)",
//!             device.identifier,
//!             device.name,
//!             device.signal_bars()
//!         );
//!     }
//!
//!     registry.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Threading Model
//!
//! All registry and device state lives on one coordinator task. Radio
//! adapters hand their completions to an [`EventSink`], which queues them
//! behind any pending timer ticks and [`Registry`] commands.
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod notify;
pub mod registry;
pub mod utils;

mod device;
mod scheduler;

// Re-exports for convenience
pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use notify::{CallbackHandle, Notification, NotificationBus, RegistryId, Topic};
pub use registry::Registry;
pub use utils::signal_bars;

// Re-export commonly used types from submodules
pub use ble::adapter::{AdapterEvent, Advertisement, EventSink, RadioAdapter};
pub use ble::btleplug_adapter::BtleplugAdapter;
pub use ble::connection::{ConnectionState, RadioState};
pub use ble::ids::{CharacteristicId, DescriptorId, DeviceId, ServiceId};
pub use ble::simulated::{AdapterCall, SimulatedAdapter};
pub use data::{DeviceSnapshot, ServiceEntry, Topology};
