//! Registry state owned by the coordinator task.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::{Command, Message};
use crate::ble::adapter::{AdapterEvent, Advertisement, EventSink, RadioAdapter};
use crate::ble::connection::{ConnectionState, RadioState};
use crate::ble::ids::DeviceId;
use crate::config::RegistryConfig;
use crate::data::DeviceSnapshot;
use crate::device::{Device, DeviceContext};
use crate::error::{Error, Result};
use crate::notify::{Notification, NotificationBus, RegistryId};
use crate::scheduler::{ScheduledTask, Scheduler, Tick};

/// Devices, lifecycle flags and the mirrored radio state.
pub(crate) struct RegistryCore {
    id: RegistryId,
    ctx: DeviceContext,
    sink: EventSink,
    devices: HashMap<DeviceId, Device>,
    running: bool,
    initialized: bool,
    radio_state: RadioState,
    scanning: bool,
    expiry: Option<ScheduledTask>,
}

impl RegistryCore {
    pub(crate) fn new(
        id: RegistryId,
        adapter: Arc<dyn RadioAdapter>,
        bus: NotificationBus,
        tx: mpsc::UnboundedSender<Message>,
        config: Arc<RegistryConfig>,
    ) -> Self {
        Self {
            id,
            ctx: DeviceContext {
                adapter,
                bus,
                scheduler: Scheduler::new(tx.clone()),
                config,
            },
            sink: EventSink::new(tx),
            devices: HashMap::new(),
            running: false,
            initialized: false,
            radio_state: RadioState::Unknown,
            scanning: false,
            expiry: None,
        }
    }

    // === Lifecycle ===

    pub(crate) fn start(&mut self, now: Instant) {
        if self.running {
            debug!("Registry {} already running", self.id);
            return;
        }

        info!("Starting registry {}", self.id);
        self.running = true;
        self.retain_connected();

        if self.initialized {
            let state = self.ctx.adapter.power_state();
            self.on_radio_state_changed(state, now);
        } else {
            self.initialized = true;
            self.ctx.adapter.initialize(self.sink.clone());
        }
    }

    pub(crate) fn stop(&mut self) {
        if !self.running {
            return;
        }

        info!("Stopping registry {}", self.id);
        self.running = false;
        self.retain_connected();
        self.expiry = None;
        if self.scanning {
            self.ctx.adapter.stop_scan();
            self.scanning = false;
        }
    }

    /// Stop and release every device.
    pub(crate) fn shutdown(&mut self, now: Instant) {
        self.stop();
        for device in self.devices.values_mut() {
            device.request_disconnect(now);
        }
        self.clear_devices();
    }

    fn retain_connected(&mut self) {
        let before = self.devices.len();
        self.devices
            .retain(|_, device| device.connection_state() == ConnectionState::Connected);
        if self.devices.len() != before {
            debug!(
                "Dropped {} unconnected devices",
                before - self.devices.len()
            );
            self.publish_devices_changed();
        }
    }

    fn clear_devices(&mut self) {
        if !self.devices.is_empty() {
            self.devices.clear();
            self.publish_devices_changed();
        }
    }

    // === Radio ===

    pub(crate) fn on_radio_state_changed(&mut self, state: RadioState, now: Instant) {
        debug!("Radio state {} -> {}", self.radio_state, state);
        self.radio_state = state;

        if self.running {
            match state {
                RadioState::PoweredOff => {
                    info!("Radio powered off, dropping all devices");
                    if self.scanning {
                        self.ctx.adapter.stop_scan();
                        self.scanning = false;
                    }
                    self.expiry = None;
                    for device in self.devices.values_mut() {
                        device.request_disconnect(now);
                    }
                    self.clear_devices();
                }
                RadioState::PoweredOn => {
                    info!("Radio powered on, scanning");
                    self.ctx
                        .adapter
                        .start_scan(self.ctx.config.allow_duplicates);
                    self.scanning = true;
                    self.expiry = Some(
                        self.ctx
                            .scheduler
                            .schedule_repeating(self.ctx.config.expiry_interval, Tick::Expiry),
                    );
                }
                _ => {}
            }
        }

        self.ctx.bus.publish(Notification::RadioStateChanged { registry: self.id });
    }

    // === Advertisements and expiry ===

    pub(crate) fn on_advertisement(&mut self, advertisement: Advertisement, now: Instant) {
        let Advertisement {
            identifier,
            rssi,
            name,
        } = advertisement;

        if let Some(device) = self.devices.get_mut(&identifier) {
            trace!("Advertisement from {} ({:?} dBm)", identifier, rssi);
            device.on_advertisement_seen(rssi, name, now);
            device.broadcast_state_change();
            return;
        }

        if !self.running {
            trace!("Registry stopped, ignoring advertisement from {}", identifier);
            return;
        }

        info!("Discovered device {} ({:?} dBm)", identifier, rssi);
        let device = Device::new(identifier.clone(), rssi, name, now, self.ctx.clone());
        self.devices.insert(identifier.clone(), device);
        self.publish_devices_changed();

        if self.ctx.config.auto_connect {
            if let Some(device) = self.devices.get_mut(&identifier) {
                device.request_connect(now);
            }
        }
    }

    pub(crate) fn on_expiry_tick(&mut self, now: Instant) {
        let lost: Vec<DeviceId> = self
            .devices
            .iter_mut()
            .filter_map(|(id, device)| device.check_lost(now).then(|| id.clone()))
            .collect();

        if lost.is_empty() {
            return;
        }

        for id in &lost {
            info!("Lost device {}", id);
            self.devices.remove(id);
        }
        self.publish_devices_changed();
    }

    fn on_signal_poll(&mut self, id: &DeviceId) {
        match self.devices.get(id) {
            Some(device) if device.is_polling_signal() => {
                self.ctx.adapter.read_signal_strength(id);
            }
            _ => trace!("Dropping stale signal poll for {}", id),
        }
    }

    pub(crate) fn handle_tick(&mut self, tick: Tick, now: Instant) {
        match tick {
            Tick::Expiry => self.on_expiry_tick(now),
            Tick::SignalPoll(id) => self.on_signal_poll(&id),
        }
    }

    // === Adapter events ===

    pub(crate) fn handle_adapter_event(&mut self, event: AdapterEvent, now: Instant) {
        match event {
            AdapterEvent::RadioStateChanged(state) => self.on_radio_state_changed(state, now),
            AdapterEvent::Advertisement(advertisement) => {
                self.on_advertisement(advertisement, now)
            }
            event => {
                let Some(id) = event.device_id().cloned() else {
                    return;
                };
                match self.devices.get_mut(&id) {
                    Some(device) => route_to_device(device, event, now),
                    None => trace!("Dropping {:?} for unknown device", event),
                }
            }
        }
    }

    // === Commands ===

    pub(crate) fn handle_command(&mut self, command: Command, now: Instant) {
        // A dropped reply receiver just means the caller stopped waiting.
        match command {
            Command::Start(reply) => {
                self.start(now);
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                self.stop();
                let _ = reply.send(());
            }
            Command::Connect { id, reply } => {
                let _ = reply.send(self.connect(&id, now));
            }
            Command::Disconnect { id, reply } => {
                let _ = reply.send(self.disconnect(&id, now));
            }
            Command::Devices(reply) => {
                let _ = reply.send(self.snapshots(now));
            }
            Command::Device { id, reply } => {
                let _ = reply.send(self.devices.get(&id).map(|d| d.snapshot(now)));
            }
            Command::Identifiers(reply) => {
                let _ = reply.send(self.identifiers());
            }
            Command::RadioState(reply) => {
                let _ = reply.send(self.radio_state);
            }
            Command::IsRunning(reply) => {
                let _ = reply.send(self.running);
            }
            Command::IsScanning(reply) => {
                let _ = reply.send(self.scanning);
            }
            Command::DeviceCount(reply) => {
                let _ = reply.send(self.devices.len());
            }
            Command::Shutdown(reply) => {
                self.shutdown(now);
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    pub(crate) fn connect(&mut self, id: &DeviceId, now: Instant) -> Result<()> {
        if self.radio_state != RadioState::PoweredOn {
            return Err(Error::BluetoothUnavailable);
        }
        self.device_mut(id)?.request_connect(now);
        Ok(())
    }

    pub(crate) fn disconnect(&mut self, id: &DeviceId, now: Instant) -> Result<()> {
        self.device_mut(id)?.request_disconnect(now);
        Ok(())
    }

    /// Listed identifiers in ascending order.
    pub(crate) fn identifiers(&self) -> Vec<DeviceId> {
        self.listed().map(|d| d.identifier().clone()).collect()
    }

    /// Listed devices in ascending identifier order.
    pub(crate) fn snapshots(&self, now: Instant) -> Vec<DeviceSnapshot> {
        self.listed().map(|d| d.snapshot(now)).collect()
    }

    fn listed(&self) -> impl Iterator<Item = &Device> {
        let named_only = self.ctx.config.named_only;
        let mut devices: Vec<&Device> = self
            .devices
            .values()
            .filter(|d| !named_only || d.has_name())
            .collect();
        devices.sort_by(|a, b| a.identifier().cmp(b.identifier()));
        devices.into_iter()
    }

    fn device_mut(&mut self, id: &DeviceId) -> Result<&mut Device> {
        self.devices.get_mut(id).ok_or_else(|| Error::DeviceNotFound {
            identifier: id.to_string(),
        })
    }

    fn publish_devices_changed(&self) {
        self.ctx
            .bus
            .publish(Notification::DevicesChanged { registry: self.id });
    }
}

fn route_to_device(device: &mut Device, event: AdapterEvent, now: Instant) {
    match event {
        AdapterEvent::Connected(_) => {
            device.touch(now);
            device.broadcast_state_change();
        }
        AdapterEvent::ConnectFailed { id, error } => {
            match error {
                Some(e) => warn!("Connection to {} failed: {}", id, e),
                None => warn!("Connection to {} failed", id),
            }
            device.touch(now);
            device.broadcast_state_change();
        }
        AdapterEvent::Disconnected { id, error } => {
            match error {
                Some(e) => info!("Device {} disconnected: {}", id, e),
                None => debug!("Device {} disconnected", id),
            }
            device.request_disconnect(now);
            device.broadcast_state_change();
        }
        AdapterEvent::NameUpdated(_) => device.broadcast_state_change(),
        AdapterEvent::SignalStrengthRead { id, result } => match result {
            Ok(rssi) => device.update_signal_strength(rssi),
            Err(e) => debug!("Signal read on {} failed: {}", id, e),
        },
        AdapterEvent::ServicesDiscovered {
            services, error, ..
        } => device.on_services_discovered(services, error),
        AdapterEvent::CharacteristicsDiscovered {
            service,
            characteristics,
            error,
            ..
        } => device.on_characteristics_discovered(service, characteristics, error),
        AdapterEvent::IncludedServicesDiscovered {
            service,
            included,
            error,
            ..
        } => device.on_included_services_discovered(service, included, error),
        AdapterEvent::DescriptorsDiscovered {
            characteristic,
            descriptors,
            error,
            ..
        } => device.on_descriptors_discovered(characteristic, descriptors, error),
        AdapterEvent::RadioStateChanged(_) | AdapterEvent::Advertisement(_) => {}
    }
}
