//! Radio adapter boundary.
//!
//! The registry drives the radio only through [`RadioAdapter`]. Every
//! request is fire-and-forget: the adapter performs the work on its own
//! execution context and reports the outcome as an [`AdapterEvent`] through
//! the [`EventSink`] handed to it by [`RadioAdapter::initialize`]. The sink
//! marshals events onto the registry's coordination task, so adapters never
//! touch registry state directly.

use tokio::sync::mpsc;
use tracing::trace;

use crate::ble::connection::{ConnectionState, RadioState};
use crate::ble::ids::{CharacteristicId, DescriptorId, DeviceId, ServiceId};
use crate::error::Error;
use crate::registry::Message;

/// A single advertisement sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// The advertising peripheral.
    pub identifier: DeviceId,
    /// Signal strength in dBm, if the radio reported one.
    pub rssi: Option<i16>,
    /// Advertised local name, if present.
    pub name: Option<String>,
}

impl Advertisement {
    /// Create an advertisement sighting.
    pub fn new(identifier: impl Into<DeviceId>, rssi: Option<i16>, name: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            rssi,
            name,
        }
    }
}

/// Asynchronous completions and callbacks delivered by a radio adapter.
#[derive(Debug)]
pub enum AdapterEvent {
    /// Radio power/availability changed.
    RadioStateChanged(RadioState),
    /// A peripheral was seen advertising.
    Advertisement(Advertisement),
    /// A connect request completed.
    Connected(DeviceId),
    /// A connect request failed.
    ConnectFailed {
        /// The peripheral.
        id: DeviceId,
        /// Why the connection failed.
        error: Option<Error>,
    },
    /// The link to a peripheral closed, requested or not.
    Disconnected {
        /// The peripheral.
        id: DeviceId,
        /// Set when the link dropped because of an error.
        error: Option<Error>,
    },
    /// The peripheral's name changed outside of advertising.
    NameUpdated(DeviceId),
    /// An active signal strength read completed.
    SignalStrengthRead {
        /// The peripheral.
        id: DeviceId,
        /// The RSSI in dBm or the read error.
        result: Result<i16, Error>,
    },
    /// Service discovery completed.
    ServicesDiscovered {
        /// The peripheral.
        id: DeviceId,
        /// Services found, possibly partial when `error` is set.
        services: Vec<ServiceId>,
        /// Discovery error, if any.
        error: Option<Error>,
    },
    /// Characteristic discovery for one service completed.
    CharacteristicsDiscovered {
        /// The peripheral.
        id: DeviceId,
        /// The service that was searched.
        service: ServiceId,
        /// Characteristics found.
        characteristics: Vec<CharacteristicId>,
        /// Discovery error, if any.
        error: Option<Error>,
    },
    /// Included service discovery for one service completed.
    IncludedServicesDiscovered {
        /// The peripheral.
        id: DeviceId,
        /// The service that was searched.
        service: ServiceId,
        /// Included services found.
        included: Vec<ServiceId>,
        /// Discovery error, if any.
        error: Option<Error>,
    },
    /// Descriptor discovery for one characteristic completed.
    DescriptorsDiscovered {
        /// The peripheral.
        id: DeviceId,
        /// The characteristic that was searched.
        characteristic: CharacteristicId,
        /// Descriptors found.
        descriptors: Vec<DescriptorId>,
        /// Discovery error, if any.
        error: Option<Error>,
    },
}

impl AdapterEvent {
    /// The peripheral this event is about, if any.
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            Self::RadioStateChanged(_) => None,
            Self::Advertisement(adv) => Some(&adv.identifier),
            Self::Connected(id) | Self::NameUpdated(id) => Some(id),
            Self::ConnectFailed { id, .. }
            | Self::Disconnected { id, .. }
            | Self::SignalStrengthRead { id, .. }
            | Self::ServicesDiscovered { id, .. }
            | Self::CharacteristicsDiscovered { id, .. }
            | Self::IncludedServicesDiscovered { id, .. }
            | Self::DescriptorsDiscovered { id, .. } => Some(id),
        }
    }
}

/// Delivers adapter events to the registry's coordination task.
///
/// Cheap to clone; adapters keep one per background task.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    /// Queue an event. Returns `false` once the registry has shut down.
    pub fn send(&self, event: AdapterEvent) -> bool {
        match self.tx.send(Message::Adapter(event)) {
            Ok(()) => true,
            Err(_) => {
                trace!("Registry closed, dropping adapter event");
                false
            }
        }
    }

    /// Check whether the registry is still accepting events.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Capability interface over a BLE central.
///
/// Request methods must not block: they start the work and return, with the
/// outcome arriving later as an [`AdapterEvent`]. The query methods report
/// the adapter's current view and are called from the coordination task, so
/// they must be cheap.
#[cfg_attr(test, mockall::automock)]
pub trait RadioAdapter: Send + Sync {
    /// Attach the event sink and begin reporting radio state.
    ///
    /// Called once, the first time the registry starts. The adapter should
    /// follow up with a [`AdapterEvent::RadioStateChanged`].
    fn initialize(&self, sink: EventSink);

    /// Current radio power state.
    fn power_state(&self) -> RadioState;

    /// Begin scanning for advertisements.
    fn start_scan(&self, allow_duplicates: bool);

    /// Stop scanning.
    fn stop_scan(&self);

    /// Request a connection. `notify_on_disconnect` asks the stack to report
    /// the link closing even while the process is in the background.
    fn connect(&self, id: &DeviceId, notify_on_disconnect: bool);

    /// Cancel a pending connection or close an open one.
    fn disconnect(&self, id: &DeviceId);

    /// Discover all primary services.
    fn discover_services(&self, id: &DeviceId);

    /// Discover the characteristics of a service.
    fn discover_characteristics(&self, id: &DeviceId, service: &ServiceId);

    /// Discover the services included by a service.
    fn discover_included_services(&self, id: &DeviceId, service: &ServiceId);

    /// Discover the descriptors of a characteristic.
    fn discover_descriptors(&self, id: &DeviceId, characteristic: &CharacteristicId);

    /// Read the current RSSI of a connected peripheral.
    fn read_signal_strength(&self, id: &DeviceId);

    /// Connection state of a peripheral as the stack sees it right now.
    fn peripheral_state(&self, id: &DeviceId) -> ConnectionState;

    /// The peripheral's current name, if it has one.
    fn peripheral_name(&self, id: &DeviceId) -> Option<String>;

    /// Release whatever the adapter holds for a peripheral the registry has
    /// dropped. A later advertisement starts tracking it afresh.
    fn forget(&self, id: &DeviceId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_device_id() {
        let id = DeviceId::from("A");
        let event = AdapterEvent::Advertisement(Advertisement::new(id.clone(), Some(-40), None));
        assert_eq!(event.device_id(), Some(&id));

        let event = AdapterEvent::RadioStateChanged(RadioState::PoweredOn);
        assert_eq!(event.device_id(), None);
    }

    #[test]
    fn test_sink_reports_closed_registry() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        assert!(sink.send(AdapterEvent::NameUpdated(DeviceId::from("A"))));

        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.send(AdapterEvent::NameUpdated(DeviceId::from("A"))));
    }
}
