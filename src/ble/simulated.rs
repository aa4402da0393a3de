//! In-memory radio adapter.
//!
//! [`SimulatedAdapter`] stands in for a real BLE stack. It records every
//! request it receives and lets the caller script the radio: power state,
//! advertisements, connection completions and discovery results. It is
//! what the crate's own tests run against and is handy for exercising UIs
//! without hardware.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

use crate::ble::adapter::{AdapterEvent, Advertisement, EventSink, RadioAdapter};
use crate::ble::connection::{ConnectionState, RadioState};
use crate::ble::ids::{CharacteristicId, DeviceId, ServiceId};

/// A request the registry made of the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    /// `initialize`
    Initialize,
    /// `start_scan`
    StartScan {
        /// Duplicate advertisement delivery requested.
        allow_duplicates: bool,
    },
    /// `stop_scan`
    StopScan,
    /// `connect`
    Connect(DeviceId),
    /// `disconnect`
    Disconnect(DeviceId),
    /// `discover_services`
    DiscoverServices(DeviceId),
    /// `discover_characteristics`
    DiscoverCharacteristics(DeviceId, ServiceId),
    /// `discover_included_services`
    DiscoverIncludedServices(DeviceId, ServiceId),
    /// `discover_descriptors`
    DiscoverDescriptors(DeviceId, CharacteristicId),
    /// `read_signal_strength`
    ReadSignalStrength(DeviceId),
    /// `forget`
    Forget(DeviceId),
}

#[derive(Debug, Default)]
struct SimPeripheral {
    state: ConnectionState,
    name: Option<String>,
}

#[derive(Debug, Default)]
struct SimState {
    power: RadioState,
    sink: Option<EventSink>,
    peripherals: HashMap<DeviceId, SimPeripheral>,
    calls: Vec<AdapterCall>,
}

/// Scriptable [`RadioAdapter`] with no radio behind it.
///
/// Requests change the simulated peripheral state the way a real stack
/// would (`connect` moves to Connecting, `disconnect` drops the link and
/// reports it) but nothing completes on its own: call
/// [`complete_connection`](Self::complete_connection) or
/// [`emit`](Self::emit) to deliver results.
#[derive(Debug, Default)]
pub struct SimulatedAdapter {
    state: Mutex<SimState>,
}

impl SimulatedAdapter {
    /// Create an adapter in the `Unknown` power state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter already in the given power state.
    pub fn with_power_state(power: RadioState) -> Self {
        let adapter = Self::new();
        adapter.state.lock().power = power;
        adapter
    }

    /// Check if the registry has attached its sink.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    /// Change the power state and report it.
    pub fn set_power_state(&self, power: RadioState) {
        self.state.lock().power = power;
        self.emit(AdapterEvent::RadioStateChanged(power));
    }

    /// Report an advertisement. A name in the advertisement becomes the
    /// peripheral's name.
    pub fn advertise(&self, id: impl Into<DeviceId>, rssi: i16, name: Option<&str>) {
        let id = id.into();
        if let Some(name) = name {
            self.state
                .lock()
                .peripherals
                .entry(id.clone())
                .or_default()
                .name = Some(name.to_string());
        }
        self.emit(AdapterEvent::Advertisement(Advertisement::new(
            id,
            Some(rssi),
            name.map(str::to_string),
        )));
    }

    /// Force a peripheral's connection state without emitting anything.
    pub fn set_peripheral_state(&self, id: &DeviceId, state: ConnectionState) {
        self.state
            .lock()
            .peripherals
            .entry(id.clone())
            .or_default()
            .state = state;
    }

    /// Rename a peripheral and report the update.
    pub fn rename(&self, id: &DeviceId, name: &str) {
        self.state
            .lock()
            .peripherals
            .entry(id.clone())
            .or_default()
            .name = Some(name.to_string());
        self.emit(AdapterEvent::NameUpdated(id.clone()));
    }

    /// Finish a pending connection.
    pub fn complete_connection(&self, id: &DeviceId) {
        self.set_peripheral_state(id, ConnectionState::Connected);
        self.emit(AdapterEvent::Connected(id.clone()));
    }

    /// Deliver an arbitrary event. Returns `false` if nothing is attached.
    pub fn emit(&self, event: AdapterEvent) -> bool {
        let sink = self.state.lock().sink.clone();
        match sink {
            Some(sink) => sink.send(event),
            None => {
                debug!("Simulated adapter not initialized, dropping {:?}", event);
                false
            }
        }
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.state.lock().calls.clone()
    }

    /// Requests received so far, clearing the log.
    pub fn take_calls(&self) -> Vec<AdapterCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    fn record(&self, call: AdapterCall) {
        self.state.lock().calls.push(call);
    }
}

impl RadioAdapter for SimulatedAdapter {
    fn initialize(&self, sink: EventSink) {
        let power = {
            let mut state = self.state.lock();
            state.calls.push(AdapterCall::Initialize);
            state.sink = Some(sink);
            state.power
        };
        self.emit(AdapterEvent::RadioStateChanged(power));
    }

    fn power_state(&self) -> RadioState {
        self.state.lock().power
    }

    fn start_scan(&self, allow_duplicates: bool) {
        self.record(AdapterCall::StartScan { allow_duplicates });
    }

    fn stop_scan(&self) {
        self.record(AdapterCall::StopScan);
    }

    fn connect(&self, id: &DeviceId, _notify_on_disconnect: bool) {
        {
            let mut state = self.state.lock();
            state.calls.push(AdapterCall::Connect(id.clone()));
            let peripheral = state.peripherals.entry(id.clone()).or_default();
            if !peripheral.state.is_connected() {
                peripheral.state = ConnectionState::Connecting;
            }
        }
    }

    fn disconnect(&self, id: &DeviceId) {
        let was_linked = {
            let mut state = self.state.lock();
            state.calls.push(AdapterCall::Disconnect(id.clone()));
            let peripheral = state.peripherals.entry(id.clone()).or_default();
            let was_linked = peripheral.state.holds_link();
            peripheral.state = ConnectionState::Disconnected;
            was_linked
        };
        if was_linked {
            self.emit(AdapterEvent::Disconnected {
                id: id.clone(),
                error: None,
            });
        }
    }

    fn discover_services(&self, id: &DeviceId) {
        self.record(AdapterCall::DiscoverServices(id.clone()));
    }

    fn discover_characteristics(&self, id: &DeviceId, service: &ServiceId) {
        self.record(AdapterCall::DiscoverCharacteristics(id.clone(), *service));
    }

    fn discover_included_services(&self, id: &DeviceId, service: &ServiceId) {
        self.record(AdapterCall::DiscoverIncludedServices(id.clone(), *service));
    }

    fn discover_descriptors(&self, id: &DeviceId, characteristic: &CharacteristicId) {
        self.record(AdapterCall::DiscoverDescriptors(id.clone(), *characteristic));
    }

    fn read_signal_strength(&self, id: &DeviceId) {
        self.record(AdapterCall::ReadSignalStrength(id.clone()));
    }

    fn peripheral_state(&self, id: &DeviceId) -> ConnectionState {
        self.state
            .lock()
            .peripherals
            .get(id)
            .map(|p| p.state)
            .unwrap_or_default()
    }

    fn peripheral_name(&self, id: &DeviceId) -> Option<String> {
        self.state
            .lock()
            .peripherals
            .get(id)
            .and_then(|p| p.name.clone())
    }

    fn forget(&self, id: &DeviceId) {
        let mut state = self.state.lock();
        state.calls.push(AdapterCall::Forget(id.clone()));
        state.peripherals.remove(id);
    }
}
