//! [`RadioAdapter`] backed by btleplug.
//!
//! btleplug is async throughout, so every request is spawned on the runtime
//! the adapter was created on and reports back through the registry's
//! [`EventSink`]. The adapter keeps its own table of peripherals so that the
//! synchronous state and name queries can be answered without awaiting.

use btleplug::api::{
    Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter, Service,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::ble::adapter::{AdapterEvent, Advertisement, EventSink, RadioAdapter};
use crate::ble::connection::{ConnectionState, RadioState};
use crate::ble::ids::{CharacteristicId, DescriptorId, DeviceId, ServiceId};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Link {
    state: ConnectionState,
    name: Option<String>,
    services: BTreeSet<Service>,
}

/// How a finished `connect()` call should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectOutcome {
    /// Report the new link.
    Established,
    /// The central event already reported it.
    AlreadyReported,
    /// A disconnect was requested meanwhile; tear the link down again.
    Cancelled,
}

/// State shared between the adapter and its spawned tasks.
///
/// Peripheral handles and link state live in separate tables so the state
/// transitions can be driven without a platform peripheral.
struct Shared {
    handles: RwLock<HashMap<DeviceId, Peripheral>>,
    links: RwLock<HashMap<DeviceId, Link>>,
    sink: RwLock<Option<EventSink>>,
    power: RwLock<RadioState>,
}

impl Shared {
    fn new() -> Self {
        Self {
            handles: RwLock::new(HashMap::new()),
            links: RwLock::new(HashMap::new()),
            sink: RwLock::new(None),
            power: RwLock::new(RadioState::Unknown),
        }
    }

    fn emit(&self, event: AdapterEvent) {
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink.send(event);
        }
    }

    fn set_power(&self, state: RadioState) {
        *self.power.write() = state;
        self.emit(AdapterEvent::RadioStateChanged(state));
    }

    fn peripheral(&self, id: &DeviceId) -> Option<Peripheral> {
        self.handles.read().get(id).cloned()
    }

    /// Start tracking a peripheral, keeping any name it already has.
    fn track(&self, id: &DeviceId, name: Option<String>) {
        let mut links = self.links.write();
        let link = links.entry(id.clone()).or_default();
        if name.is_some() {
            link.name = name;
        }
    }

    fn forget(&self, id: &DeviceId) {
        self.handles.write().remove(id);
        self.links.write().remove(id);
    }

    fn state(&self, id: &DeviceId) -> ConnectionState {
        self.links
            .read()
            .get(id)
            .map(|link| link.state)
            .unwrap_or_default()
    }

    fn name(&self, id: &DeviceId) -> Option<String> {
        self.links.read().get(id).and_then(|link| link.name.clone())
    }

    /// Update a tracked peripheral's state. Returns the previous state.
    fn set_state(&self, id: &DeviceId, state: ConnectionState) -> Option<ConnectionState> {
        self.links
            .write()
            .get_mut(id)
            .map(|link| std::mem::replace(&mut link.state, state))
    }

    fn begin_connect(&self, id: &DeviceId) {
        self.set_state(id, ConnectionState::Connecting);
    }

    /// Resolve a successful `connect()` against what happened meanwhile.
    fn connect_succeeded(&self, id: &DeviceId) -> ConnectOutcome {
        let outcome = {
            let mut links = self.links.write();
            match links.get_mut(id) {
                Some(link) if link.state == ConnectionState::Connecting => {
                    link.state = ConnectionState::Connected;
                    ConnectOutcome::Established
                }
                Some(link) if link.state == ConnectionState::Connected => {
                    ConnectOutcome::AlreadyReported
                }
                _ => ConnectOutcome::Cancelled,
            }
        };
        if outcome == ConnectOutcome::Established {
            self.emit(AdapterEvent::Connected(id.clone()));
        }
        outcome
    }

    fn connect_failed(&self, id: &DeviceId, error: Error) {
        match self.set_state(id, ConnectionState::Disconnected) {
            Some(ConnectionState::Connecting) => self.emit(AdapterEvent::ConnectFailed {
                id: id.clone(),
                error: Some(error),
            }),
            Some(ConnectionState::Connected) => self.emit(AdapterEvent::Disconnected {
                id: id.clone(),
                error: Some(error),
            }),
            // A pending disconnect reports the outcome.
            _ => debug!("Connect to {} failed after cancel: {}", id, error),
        }
    }

    /// The central reported a link. Only links this adapter asked for count.
    fn link_up(&self, id: &DeviceId) {
        let previous = {
            let mut links = self.links.write();
            match links.get_mut(id) {
                Some(link) if link.state == ConnectionState::Connecting => {
                    link.state = ConnectionState::Connected;
                    Some(ConnectionState::Connecting)
                }
                Some(link) => Some(link.state),
                None => None,
            }
        };
        match previous {
            Some(ConnectionState::Connecting) => self.emit(AdapterEvent::Connected(id.clone())),
            Some(ConnectionState::Connected) => {}
            other => debug!("Ignoring unrequested link to {} ({:?})", id, other),
        }
    }

    /// Mark a disconnect as pending. Returns `false` if no link is held.
    fn begin_disconnect(&self, id: &DeviceId) -> bool {
        let mut links = self.links.write();
        match links.get_mut(id) {
            Some(link) if link.state.holds_link() => {
                link.state = ConnectionState::Disconnecting;
                true
            }
            _ => false,
        }
    }

    /// The link closed, requested or not. Reported once.
    fn link_down(&self, id: &DeviceId, error: Option<Error>) {
        match self.set_state(id, ConnectionState::Disconnected) {
            Some(ConnectionState::Disconnected) | None => {}
            Some(_) => self.emit(AdapterEvent::Disconnected {
                id: id.clone(),
                error,
            }),
        }
    }

    fn set_services(&self, id: &DeviceId, services: BTreeSet<Service>) {
        if let Some(link) = self.links.write().get_mut(id) {
            link.services = services;
        }
    }

    fn characteristics(&self, id: &DeviceId, service: &ServiceId) -> Option<Vec<CharacteristicId>> {
        self.links
            .read()
            .get(id)
            .and_then(|link| characteristics_of(&link.services, service))
    }

    fn descriptors(
        &self,
        id: &DeviceId,
        characteristic: &CharacteristicId,
    ) -> Option<Vec<DescriptorId>> {
        self.links
            .read()
            .get(id)
            .and_then(|link| descriptors_of(&link.services, characteristic))
    }
}

/// Production radio adapter over the first btleplug adapter.
pub struct BtleplugAdapter {
    adapter: Adapter,
    shared: Arc<Shared>,
    runtime: Handle,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl BtleplugAdapter {
    /// Open the system's first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Wrap a specific btleplug adapter.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            shared: Arc::new(Shared::new()),
            runtime: Handle::current(),
            event_task: Mutex::new(None),
        }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    async fn run_events(adapter: Adapter, shared: Arc<Shared>) {
        let mut events = match adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to get adapter events: {}", e);
                shared.set_power(RadioState::Unsupported);
                return;
            }
        };

        // Read after subscribing so no update falls in between.
        shared.set_power(initial_radio_state(adapter.adapter_state().await));

        while let Some(event) = events.next().await {
            Self::handle_event(event, &adapter, &shared).await;
        }

        debug!("Central event loop ended");
    }

    async fn handle_event(event: CentralEvent, adapter: &Adapter, shared: &Arc<Shared>) {
        match event {
            CentralEvent::DeviceDiscovered(pid) | CentralEvent::DeviceUpdated(pid) => {
                Self::process_peripheral(adapter, pid, shared).await;
            }
            CentralEvent::DeviceConnected(pid) => {
                let id = device_id(&pid);
                debug!("Device connected: {}", id);
                shared.link_up(&id);
            }
            CentralEvent::DeviceDisconnected(pid) => {
                let id = device_id(&pid);
                debug!("Device disconnected: {}", id);
                shared.link_down(&id, None);
            }
            CentralEvent::StateUpdate(state) => shared.set_power(radio_state(state)),
            _ => {}
        }
    }

    async fn process_peripheral(adapter: &Adapter, pid: PeripheralId, shared: &Arc<Shared>) {
        let peripheral = match adapter.peripheral(&pid).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return,
        };

        let id = device_id(&pid);
        shared.handles.write().entry(id.clone()).or_insert(peripheral);
        shared.track(&id, properties.local_name.clone());

        shared.emit(AdapterEvent::Advertisement(Advertisement::new(
            id,
            properties.rssi,
            properties.local_name,
        )));
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(task);
    }

    fn unknown(&self, id: &DeviceId) -> Error {
        Error::DeviceNotFound {
            identifier: id.to_string(),
        }
    }
}

impl RadioAdapter for BtleplugAdapter {
    fn initialize(&self, sink: EventSink) {
        *self.shared.sink.write() = Some(sink);

        let task = self
            .runtime
            .spawn(Self::run_events(self.adapter.clone(), self.shared.clone()));
        if let Some(previous) = self.event_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn power_state(&self) -> RadioState {
        *self.shared.power.read()
    }

    fn start_scan(&self, allow_duplicates: bool) {
        // btleplug reports every advertisement as DeviceUpdated already.
        debug!("Starting scan (allow_duplicates: {})", allow_duplicates);
        let adapter = self.adapter.clone();
        self.spawn(async move {
            if let Err(e) = adapter.start_scan(ScanFilter::default()).await {
                warn!("Failed to start scan: {}", e);
            }
        });
    }

    fn stop_scan(&self) {
        let adapter = self.adapter.clone();
        self.spawn(async move {
            if let Err(e) = adapter.stop_scan().await {
                warn!("Failed to stop scan: {}", e);
            }
        });
    }

    fn connect(&self, id: &DeviceId, _notify_on_disconnect: bool) {
        let Some(peripheral) = self.shared.peripheral(id) else {
            self.shared.emit(AdapterEvent::ConnectFailed {
                id: id.clone(),
                error: Some(self.unknown(id)),
            });
            return;
        };

        self.shared.begin_connect(id);

        let shared = self.shared.clone();
        let id = id.clone();
        self.spawn(async move {
            match peripheral.connect().await {
                Ok(()) => {
                    if shared.connect_succeeded(&id) == ConnectOutcome::Cancelled {
                        debug!("Connect to {} was cancelled, dropping link", id);
                        if let Err(e) = peripheral.disconnect().await {
                            warn!("Failed to drop cancelled link to {}: {}", id, e);
                        }
                    }
                }
                Err(e) => shared.connect_failed(&id, e.into()),
            }
        });
    }

    fn disconnect(&self, id: &DeviceId) {
        let Some(peripheral) = self.shared.peripheral(id) else {
            return;
        };
        if !self.shared.begin_disconnect(id) {
            return;
        }

        let shared = self.shared.clone();
        let id = id.clone();
        self.spawn(async move {
            let error = peripheral.disconnect().await.err().map(Error::from);
            shared.link_down(&id, error);
        });
    }

    fn discover_services(&self, id: &DeviceId) {
        let Some(peripheral) = self.shared.peripheral(id) else {
            return;
        };

        let shared = self.shared.clone();
        let id = id.clone();
        self.spawn(async move {
            let error = peripheral.discover_services().await.err().map(Error::from);
            let services = peripheral.services();
            let ids = service_ids(&services);

            shared.set_services(&id, services);

            shared.emit(AdapterEvent::ServicesDiscovered {
                id,
                services: ids,
                error,
            });
        });
    }

    fn discover_characteristics(&self, id: &DeviceId, service: &ServiceId) {
        let found = self.shared.characteristics(id, service);

        let (characteristics, error) = match found {
            Some(characteristics) => (characteristics, None),
            None => (
                Vec::new(),
                Some(Error::DiscoveryFailed {
                    context: format!("service {} not found on {}", service, id),
                }),
            ),
        };

        self.shared.emit(AdapterEvent::CharacteristicsDiscovered {
            id: id.clone(),
            service: *service,
            characteristics,
            error,
        });
    }

    fn discover_included_services(&self, id: &DeviceId, service: &ServiceId) {
        // btleplug does not expose included services.
        self.shared.emit(AdapterEvent::IncludedServicesDiscovered {
            id: id.clone(),
            service: *service,
            included: Vec::new(),
            error: None,
        });
    }

    fn discover_descriptors(&self, id: &DeviceId, characteristic: &CharacteristicId) {
        let found = self.shared.descriptors(id, characteristic);

        let (descriptors, error) = match found {
            Some(descriptors) => (descriptors, None),
            None => (
                Vec::new(),
                Some(Error::DiscoveryFailed {
                    context: format!("characteristic {} not found on {}", characteristic, id),
                }),
            ),
        };

        self.shared.emit(AdapterEvent::DescriptorsDiscovered {
            id: id.clone(),
            characteristic: *characteristic,
            descriptors,
            error,
        });
    }

    fn read_signal_strength(&self, id: &DeviceId) {
        let Some(peripheral) = self.shared.peripheral(id) else {
            return;
        };

        let shared = self.shared.clone();
        let id = id.clone();
        self.spawn(async move {
            let result = match peripheral.properties().await {
                Ok(Some(properties)) => properties.rssi.ok_or_else(|| Error::SignalUnavailable {
                    identifier: id.to_string(),
                }),
                Ok(None) => Err(Error::SignalUnavailable {
                    identifier: id.to_string(),
                }),
                Err(e) => Err(e.into()),
            };
            shared.emit(AdapterEvent::SignalStrengthRead { id, result });
        });
    }

    fn peripheral_state(&self, id: &DeviceId) -> ConnectionState {
        self.shared.state(id)
    }

    fn peripheral_name(&self, id: &DeviceId) -> Option<String> {
        self.shared.name(id)
    }

    fn forget(&self, id: &DeviceId) {
        trace!("Forgetting peripheral {}", id);
        self.shared.forget(id);
    }
}

impl Drop for BtleplugAdapter {
    fn drop(&mut self) {
        if let Some(task) = self.event_task.lock().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for BtleplugAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleplugAdapter")
            .field("power", &*self.shared.power.read())
            .field("peripherals", &self.shared.links.read().len())
            .finish()
    }
}

fn device_id(pid: &PeripheralId) -> DeviceId {
    DeviceId::from(pid.to_string())
}

fn radio_state(state: CentralState) -> RadioState {
    match state {
        CentralState::PoweredOn => RadioState::PoweredOn,
        CentralState::PoweredOff => RadioState::PoweredOff,
        CentralState::Unknown => RadioState::Unknown,
    }
}

fn initial_radio_state(state: btleplug::Result<CentralState>) -> RadioState {
    match state {
        Ok(state) => radio_state(state),
        Err(e) => {
            warn!("Failed to read adapter state: {}", e);
            RadioState::Unknown
        }
    }
}

fn service_ids(services: &BTreeSet<Service>) -> Vec<ServiceId> {
    services.iter().map(|s| ServiceId(s.uuid)).collect()
}

fn characteristics_of(
    services: &BTreeSet<Service>,
    service: &ServiceId,
) -> Option<Vec<CharacteristicId>> {
    services.iter().find(|s| s.uuid == service.0).map(|s| {
        s.characteristics
            .iter()
            .map(|c| CharacteristicId::new(*service, c.uuid))
            .collect()
    })
}

fn descriptors_of(
    services: &BTreeSet<Service>,
    characteristic: &CharacteristicId,
) -> Option<Vec<DescriptorId>> {
    services
        .iter()
        .find(|s| s.uuid == characteristic.service.0)
        .and_then(|s| {
            s.characteristics
                .iter()
                .find(|c| c.uuid == characteristic.uuid)
        })
        .map(|c| c.descriptors.iter().map(|d| DescriptorId(d.uuid)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{
        from_short, BATTERY_SERVICE_UUID, CLIENT_CHARACTERISTIC_CONFIG_UUID, DEVICE_INFO_SERVICE_UUID,
    };
    use crate::registry::Message;
    use btleplug::api::{CharPropFlags, Characteristic, Descriptor};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    const LEVEL: Uuid = from_short(0x2a19);
    const CCCD: Uuid = CLIENT_CHARACTERISTIC_CONFIG_UUID;

    fn gatt_table() -> BTreeSet<Service> {
        let descriptor = Descriptor {
            uuid: CCCD,
            service_uuid: BATTERY_SERVICE_UUID,
            characteristic_uuid: LEVEL,
        };
        let level = Characteristic {
            uuid: LEVEL,
            service_uuid: BATTERY_SERVICE_UUID,
            properties: CharPropFlags::READ | CharPropFlags::NOTIFY,
            descriptors: BTreeSet::from([descriptor]),
        };
        BTreeSet::from([
            Service {
                uuid: BATTERY_SERVICE_UUID,
                primary: true,
                characteristics: BTreeSet::from([level]),
            },
            Service {
                uuid: DEVICE_INFO_SERVICE_UUID,
                primary: true,
                characteristics: BTreeSet::new(),
            },
        ])
    }

    fn tracked(id: &str) -> (Shared, DeviceId, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Shared::new();
        *shared.sink.write() = Some(EventSink::new(tx));
        let id = DeviceId::from(id);
        shared.track(&id, None);
        (shared, id, rx)
    }

    fn events(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<AdapterEvent> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Message::Adapter(event) = message {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn test_connect_completes_normally() {
        let (shared, id, mut rx) = tracked("A");

        shared.begin_connect(&id);
        assert_eq!(shared.state(&id), ConnectionState::Connecting);

        assert_eq!(shared.connect_succeeded(&id), ConnectOutcome::Established);
        assert_eq!(shared.state(&id), ConnectionState::Connected);

        // The central's own event for the same link is a duplicate.
        shared.link_up(&id);

        let events = events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AdapterEvent::Connected(d) if d == &id));
    }

    #[test]
    fn test_central_event_before_connect_resolves() {
        let (shared, id, mut rx) = tracked("A");

        shared.begin_connect(&id);
        shared.link_up(&id);
        assert_eq!(shared.state(&id), ConnectionState::Connected);

        // The link stays up and is reported exactly once.
        assert_eq!(shared.connect_succeeded(&id), ConnectOutcome::AlreadyReported);
        assert_eq!(shared.state(&id), ConnectionState::Connected);

        let events = events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AdapterEvent::Connected(d) if d == &id));
    }

    #[test]
    fn test_disconnect_during_connect() {
        let (shared, id, mut rx) = tracked("A");

        shared.begin_connect(&id);
        assert!(shared.begin_disconnect(&id));
        assert_eq!(shared.state(&id), ConnectionState::Disconnecting);

        assert_eq!(shared.connect_succeeded(&id), ConnectOutcome::Cancelled);
        shared.link_down(&id, None);
        // The cancelled link closing again is not reported twice.
        shared.link_down(&id, None);

        assert_eq!(shared.state(&id), ConnectionState::Disconnected);
        let events = events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AdapterEvent::Disconnected { id: d, error: None } if d == &id));
    }

    #[test]
    fn test_central_event_ignored_while_disconnecting() {
        let (shared, id, mut rx) = tracked("A");

        shared.begin_connect(&id);
        assert!(shared.begin_disconnect(&id));
        shared.link_up(&id);

        assert_eq!(shared.state(&id), ConnectionState::Disconnecting);
        assert!(events(&mut rx).is_empty());
    }

    #[test]
    fn test_connect_failure_reported_once() {
        let (shared, id, mut rx) = tracked("A");

        shared.begin_connect(&id);
        shared.connect_failed(&id, Error::BluetoothUnavailable);
        assert_eq!(shared.state(&id), ConnectionState::Disconnected);

        // After a cancel the pending disconnect owns the report.
        shared.begin_connect(&id);
        assert!(shared.begin_disconnect(&id));
        shared.connect_failed(&id, Error::BluetoothUnavailable);

        let events = events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AdapterEvent::ConnectFailed { id: d, error: Some(_) } if d == &id));
    }

    #[test]
    fn test_disconnect_requires_link() {
        let (shared, id, mut rx) = tracked("A");
        assert!(!shared.begin_disconnect(&id));
        assert!(!shared.begin_disconnect(&DeviceId::from("untracked")));

        shared.link_up(&id);
        assert_eq!(shared.state(&id), ConnectionState::Disconnected);
        assert!(events(&mut rx).is_empty());
    }

    #[test]
    fn test_forget_drops_entry() {
        let (shared, id, mut rx) = tracked("A");
        shared.track(&id, Some("Sensor".to_string()));
        shared.track(&id, None);
        assert_eq!(shared.name(&id), Some("Sensor".to_string()));

        shared.begin_connect(&id);
        shared.forget(&id);

        assert_eq!(shared.name(&id), None);
        assert_eq!(shared.state(&id), ConnectionState::Disconnected);
        assert!(shared.links.read().is_empty());
        assert_eq!(shared.connect_succeeded(&id), ConnectOutcome::Cancelled);
        shared.link_down(&id, None);
        assert!(events(&mut rx).is_empty());
    }

    #[test]
    fn test_initial_radio_state() {
        assert_eq!(
            initial_radio_state(Ok(CentralState::PoweredOff)),
            RadioState::PoweredOff
        );
        assert_eq!(
            initial_radio_state(Ok(CentralState::PoweredOn)),
            RadioState::PoweredOn
        );
        assert_eq!(
            initial_radio_state(Err(btleplug::Error::NotSupported("state".to_string()))),
            RadioState::Unknown
        );
    }

    #[test]
    fn test_power_change_reported() {
        let (shared, _id, mut rx) = tracked("A");
        shared.set_power(RadioState::PoweredOff);
        assert_eq!(*shared.power.read(), RadioState::PoweredOff);
        assert!(matches!(
            events(&mut rx).as_slice(),
            [AdapterEvent::RadioStateChanged(RadioState::PoweredOff)]
        ));
    }

    #[test]
    fn test_radio_state_mapping() {
        assert_eq!(radio_state(CentralState::PoweredOn), RadioState::PoweredOn);
        assert_eq!(radio_state(CentralState::PoweredOff), RadioState::PoweredOff);
        assert_eq!(radio_state(CentralState::Unknown), RadioState::Unknown);
    }

    #[test]
    fn test_service_lookup() {
        let table = gatt_table();
        let ids = service_ids(&table);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&ServiceId(BATTERY_SERVICE_UUID)));

        let battery = ServiceId(BATTERY_SERVICE_UUID);
        assert_eq!(
            characteristics_of(&table, &battery),
            Some(vec![CharacteristicId::new(battery, LEVEL)])
        );
        assert_eq!(
            characteristics_of(&table, &ServiceId(DEVICE_INFO_SERVICE_UUID)),
            Some(Vec::new())
        );
        assert_eq!(characteristics_of(&table, &ServiceId(Uuid::nil())), None);

        let (shared, id, _rx) = tracked("A");
        shared.set_services(&id, table);
        assert_eq!(
            shared.characteristics(&id, &battery),
            Some(vec![CharacteristicId::new(battery, LEVEL)])
        );
        assert_eq!(shared.characteristics(&DeviceId::from("B"), &battery), None);
    }

    #[test]
    fn test_descriptor_lookup() {
        let table = gatt_table();
        let battery = ServiceId(BATTERY_SERVICE_UUID);

        assert_eq!(
            descriptors_of(&table, &CharacteristicId::new(battery, LEVEL)),
            Some(vec![DescriptorId(CCCD)])
        );
        assert_eq!(
            descriptors_of(&table, &CharacteristicId::new(battery, Uuid::nil())),
            None
        );
    }
}
