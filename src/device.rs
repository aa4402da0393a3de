//! Per-peripheral state machine.
//!
//! A [`Device`] tracks one peripheral from its first advertisement until the
//! registry drops it. Connection state is always read back from the radio
//! adapter; the device only remembers the last state it *announced* so it
//! can tell when to notify. Connecting also starts an RSSI poll and reaching
//! Connected starts GATT discovery, which then fans out through services,
//! characteristics/included services and descriptors as completions arrive.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ble::adapter::RadioAdapter;
use crate::ble::connection::ConnectionState;
use crate::ble::ids::{CharacteristicId, DescriptorId, DeviceId, ServiceId};
use crate::config::RegistryConfig;
use crate::data::{DeviceSnapshot, Topology};
use crate::error::Error;
use crate::notify::{Notification, NotificationBus};
use crate::scheduler::{ScheduledTask, Scheduler, Tick};

/// Shared collaborators every device needs.
#[derive(Clone)]
pub(crate) struct DeviceContext {
    pub(crate) adapter: Arc<dyn RadioAdapter>,
    pub(crate) bus: NotificationBus,
    pub(crate) scheduler: Scheduler,
    pub(crate) config: Arc<RegistryConfig>,
}

/// A discovered peripheral.
///
/// Owned by the registry's coordination task. Consumers see it only through
/// [`DeviceSnapshot`]s.
pub struct Device {
    identifier: DeviceId,
    ctx: DeviceContext,
    advertised_name: Option<String>,
    signal_strength: Option<i16>,
    first_seen: DateTime<Utc>,
    last_seen_at: Instant,
    connect_requested_at: Option<Instant>,
    /// State last announced via `StateChanged`.
    last_state: ConnectionState,
    /// Name last announced via `NameChanged`.
    last_name: String,
    topology: Topology,
    signal_poll: Option<ScheduledTask>,
}

impl Device {
    /// Create a device for a first sighting. Starts Disconnected.
    pub(crate) fn new(
        identifier: DeviceId,
        rssi: Option<i16>,
        advertised_name: Option<String>,
        now: Instant,
        ctx: DeviceContext,
    ) -> Self {
        let mut device = Self {
            identifier,
            ctx,
            advertised_name,
            signal_strength: rssi,
            first_seen: Utc::now(),
            last_seen_at: now,
            connect_requested_at: None,
            last_state: ConnectionState::Disconnected,
            last_name: String::new(),
            topology: Topology::new(),
            signal_poll: None,
        };
        device.last_name = device.name();
        device
    }

    // === Identification ===

    /// Get the stable identifier.
    pub fn identifier(&self) -> &DeviceId {
        &self.identifier
    }

    /// Current name, falling back to the advertised name and then the
    /// configured placeholder.
    pub fn name(&self) -> String {
        self.ctx
            .adapter
            .peripheral_name(&self.identifier)
            .or_else(|| self.advertised_name.clone())
            .unwrap_or_else(|| self.ctx.config.placeholder_name.clone())
    }

    /// Check if the device has a name other than the placeholder.
    pub fn has_name(&self) -> bool {
        self.name() != self.ctx.config.placeholder_name
    }

    // === Connection ===

    /// Connection state as the adapter reports it now.
    pub fn connection_state(&self) -> ConnectionState {
        self.ctx.adapter.peripheral_state(&self.identifier)
    }

    /// Get the last RSSI reading.
    pub fn signal_strength(&self) -> Option<i16> {
        self.signal_strength
    }

    /// Time of the last advertisement or connection activity.
    pub fn last_seen_at(&self) -> Instant {
        self.last_seen_at
    }

    /// Time the current connection attempt started.
    pub fn connect_requested_at(&self) -> Option<Instant> {
        self.connect_requested_at
    }

    /// Check if RSSI polling is active.
    pub fn is_polling_signal(&self) -> bool {
        self.signal_poll.is_some()
    }

    /// Discovered GATT layout.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Copy out the observable state.
    pub fn snapshot(&self, now: Instant) -> DeviceSnapshot {
        DeviceSnapshot {
            identifier: self.identifier.clone(),
            name: self.name(),
            connection_state: self.connection_state(),
            signal_strength: self.signal_strength(),
            first_seen: self.first_seen,
            last_seen_ago: now.saturating_duration_since(self.last_seen_at()),
            topology: self.topology().clone(),
        }
    }

    /// Start connecting.
    ///
    /// Ignored unless the peripheral is Disconnected or Disconnecting.
    pub(crate) fn request_connect(&mut self, now: Instant) {
        let state = self.connection_state();
        if !state.can_connect() {
            debug!("Ignoring connect for {} while {}", self.identifier, state);
            return;
        }

        info!("Connecting to {}", self.identifier);

        // Replacing an old poll drops (and cancels) it.
        self.signal_poll = Some(self.ctx.scheduler.schedule_repeating(
            self.ctx.config.signal_poll_interval,
            Tick::SignalPoll(self.identifier.clone()),
        ));

        self.last_seen_at = now;
        self.connect_requested_at = Some(now);
        self.ctx.adapter.connect(&self.identifier, true);
        self.broadcast_state_change();
    }

    /// Stop polling and drop the link if one is held or pending.
    ///
    /// Safe to call repeatedly.
    pub(crate) fn request_disconnect(&mut self, now: Instant) {
        if let Some(poll) = self.signal_poll.take() {
            poll.cancel();
            self.last_seen_at = now;
            self.broadcast_state_change();
        }

        let state = self.connection_state();
        if state.holds_link() {
            info!("Disconnecting from {}", self.identifier);
            self.ctx.adapter.disconnect(&self.identifier);
        }
    }

    /// Mark the device as active now.
    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_seen_at = now;
    }

    /// Apply an advertisement sighting.
    pub(crate) fn on_advertisement_seen(
        &mut self,
        rssi: Option<i16>,
        name: Option<String>,
        now: Instant,
    ) {
        self.last_seen_at = now;
        if name.is_some() {
            self.advertised_name = name;
        }
        if let Some(rssi) = rssi {
            self.update_signal_strength(rssi);
        }
    }

    /// Record an RSSI reading, notifying only when the value moved.
    pub(crate) fn update_signal_strength(&mut self, rssi: i16) {
        if self.signal_strength == Some(rssi) {
            return;
        }
        self.signal_strength = Some(rssi);
        self.publish(Notification::SignalStrengthChanged {
            device: self.identifier.clone(),
        });
    }

    /// Re-read the adapter state and announce anything that changed.
    pub(crate) fn broadcast_state_change(&mut self) {
        let observed = self.connection_state();
        self.on_connection_state_observed(observed);
    }

    /// Compare an observed state and the current name against what was
    /// last announced.
    ///
    /// The state and name checks are independent; both run on every call.
    pub(crate) fn on_connection_state_observed(&mut self, observed: ConnectionState) {
        if observed != self.last_state {
            debug!(
                "Device {} state changed: {} -> {}",
                self.identifier, self.last_state, observed
            );
            if observed.is_connected() {
                self.topology.clear();
                self.ctx.adapter.discover_services(&self.identifier);
            }
            self.last_state = observed;
            self.publish(Notification::StateChanged {
                device: self.identifier.clone(),
            });
        }

        let name = self.name();
        if name != self.last_name {
            debug!("Device {} renamed: {:?} -> {:?}", self.identifier, self.last_name, name);
            self.last_name = name;
            self.publish(Notification::NameChanged {
                device: self.identifier.clone(),
            });
        }
    }

    /// Store discovered services and ask for their contents.
    pub(crate) fn on_services_discovered(&mut self, services: Vec<ServiceId>, error: Option<Error>) {
        if let Some(e) = error {
            warn!("Service discovery on {} failed: {}", self.identifier, e);
        }
        debug!("Device {} has {} services", self.identifier, services.len());

        self.topology.replace_services(services.iter().copied());
        self.publish(Notification::ServicesChanged {
            device: self.identifier.clone(),
        });

        for service in &services {
            self.ctx
                .adapter
                .discover_characteristics(&self.identifier, service);
        }
        for service in &services {
            self.ctx
                .adapter
                .discover_included_services(&self.identifier, service);
        }
    }

    /// Store a service's characteristics and ask for their descriptors.
    pub(crate) fn on_characteristics_discovered(
        &mut self,
        service: ServiceId,
        characteristics: Vec<CharacteristicId>,
        error: Option<Error>,
    ) {
        if let Some(e) = error {
            warn!(
                "Characteristic discovery on {} for {} failed: {}",
                self.identifier, service, e
            );
        }

        self.topology
            .set_characteristics(service, characteristics.iter().copied());
        self.publish(Notification::CharacteristicsChanged {
            device: self.identifier.clone(),
            service,
        });

        for characteristic in &characteristics {
            self.ctx
                .adapter
                .discover_descriptors(&self.identifier, characteristic);
        }
    }

    /// Store a service's included services.
    pub(crate) fn on_included_services_discovered(
        &mut self,
        service: ServiceId,
        included: Vec<ServiceId>,
        error: Option<Error>,
    ) {
        if let Some(e) = error {
            warn!(
                "Included service discovery on {} for {} failed: {}",
                self.identifier, service, e
            );
        }

        self.topology.set_included_services(service, included);
        self.publish(Notification::IncludedServicesChanged {
            device: self.identifier.clone(),
            service,
        });
    }

    /// Store a characteristic's descriptors.
    pub(crate) fn on_descriptors_discovered(
        &mut self,
        characteristic: CharacteristicId,
        descriptors: Vec<DescriptorId>,
        error: Option<Error>,
    ) {
        if let Some(e) = error {
            warn!(
                "Descriptor discovery on {} for {} failed: {}",
                self.identifier, characteristic, e
            );
        }

        self.topology.set_descriptors(characteristic, descriptors);
        self.publish(Notification::DescriptorsChanged {
            device: self.identifier.clone(),
            service: characteristic.service,
        });
    }

    /// Liveness check run by the expiry sweep.
    ///
    /// A connection pending for at least the connect timeout is cancelled.
    /// Returns `true` only if the device was Disconnected when checked and
    /// has not been seen for longer than the lost timeout.
    pub(crate) fn check_lost(&mut self, now: Instant) -> bool {
        let state = self.connection_state();

        if state == ConnectionState::Connecting {
            if let Some(started) = self.connect_requested_at() {
                if now.saturating_duration_since(started) >= self.ctx.config.connect_timeout {
                    info!("Connection to {} timed out", self.identifier);
                    self.request_disconnect(now);
                }
            }
        }

        state == ConnectionState::Disconnected
            && now.saturating_duration_since(self.last_seen_at) > self.ctx.config.lost_timeout
    }

    fn publish(&self, notification: Notification) {
        self.ctx.bus.publish(notification);
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.request_disconnect(Instant::now());
        self.ctx.adapter.forget(&self.identifier);
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("identifier", &self.identifier)
            .field("name", &self.name())
            .field("connection_state", &self.connection_state())
            .field("signal_strength", &self.signal_strength)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::adapter::MockRadioAdapter;
    use crate::ble::simulated::{AdapterCall, SimulatedAdapter};
    use crate::notify::drain;
    use crate::registry::Message;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::time::Duration;
    use tokio::sync::{broadcast, mpsc};
    use uuid::Uuid;

    struct Harness {
        sim: Arc<SimulatedAdapter>,
        rx: broadcast::Receiver<Notification>,
        _messages: mpsc::UnboundedReceiver<Message>,
        ctx: DeviceContext,
    }

    fn harness() -> Harness {
        let sim = Arc::new(SimulatedAdapter::new());
        harness_with(sim.clone(), sim)
    }

    fn harness_with(sim: Arc<SimulatedAdapter>, adapter: Arc<dyn RadioAdapter>) -> Harness {
        let (tx, messages) = mpsc::unbounded_channel();
        let bus = NotificationBus::new(64);
        let rx = bus.subscribe();
        Harness {
            sim,
            rx,
            _messages: messages,
            ctx: DeviceContext {
                adapter,
                bus,
                scheduler: Scheduler::new(tx),
                config: Arc::new(RegistryConfig::default()),
            },
        }
    }

    fn device(h: &Harness, id: &str, rssi: i16, now: Instant) -> Device {
        Device::new(DeviceId::from(id), Some(rssi), None, now, h.ctx.clone())
    }

    fn service(n: u128) -> ServiceId {
        ServiceId(Uuid::from_u128(n))
    }

    fn count(notifications: &[Notification], topic: crate::notify::Topic) -> usize {
        notifications.iter().filter(|n| n.topic() == topic).count()
    }

    #[test]
    fn test_new_device_defaults() {
        let h = harness();
        let now = Instant::now();
        let d = device(&h, "A", -55, now);

        assert_eq!(d.identifier().as_str(), "A");
        assert_eq!(d.connection_state(), ConnectionState::Disconnected);
        assert_eq!(d.signal_strength(), Some(-55));
        assert_eq!(d.name(), "unknown");
        assert!(!d.has_name());
        assert_eq!(d.last_seen_at(), now);
        assert!(d.topology().is_empty());
    }

    #[test]
    fn test_signal_strength_notifies_only_on_change() {
        let mut h = harness();
        let now = Instant::now();
        let mut d = device(&h, "A", -55, now);

        d.on_advertisement_seen(Some(-55), None, now + Duration::from_secs(1));
        assert!(drain(&mut h.rx).is_empty());
        assert_eq!(d.last_seen_at(), now + Duration::from_secs(1));

        d.on_advertisement_seen(Some(-60), None, now + Duration::from_secs(2));
        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::SignalStrengthChanged {
                device: DeviceId::from("A")
            }]
        );
        assert_eq!(d.signal_strength(), Some(-60));

        d.on_advertisement_seen(None, None, now + Duration::from_secs(3));
        assert!(drain(&mut h.rx).is_empty());
        assert_eq!(d.signal_strength(), Some(-60));
    }

    #[tokio::test]
    async fn test_request_connect_from_disconnected() {
        let mut h = harness();
        let now = Instant::now();
        let mut d = device(&h, "B", -70, now);

        let later = now + Duration::from_secs(3);
        d.request_connect(later);

        assert_eq!(d.connection_state(), ConnectionState::Connecting);
        assert_eq!(d.connect_requested_at(), Some(later));
        assert_eq!(d.last_seen_at(), later);
        assert!(d.is_polling_signal());
        assert_eq!(h.sim.take_calls(), vec![AdapterCall::Connect(DeviceId::from("B"))]);
        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::StateChanged {
                device: DeviceId::from("B")
            }]
        );
    }

    #[tokio::test]
    async fn test_request_connect_ignored_when_connected() {
        let mut h = harness();
        let mut d = device(&h, "B", -70, Instant::now());
        h.sim
            .set_peripheral_state(d.identifier(), ConnectionState::Connected);

        d.request_connect(Instant::now());
        assert!(!d.is_polling_signal());
        assert!(h.sim.take_calls().is_empty());
        assert!(drain(&mut h.rx).is_empty());
    }

    #[tokio::test]
    async fn test_connected_transition_starts_discovery() {
        let mut h = harness();
        let now = Instant::now();
        let mut d = device(&h, "B", -70, now);
        d.request_connect(now);
        d.topology.replace_services([service(99)]);
        h.sim.take_calls();
        drain(&mut h.rx);

        h.sim
            .set_peripheral_state(d.identifier(), ConnectionState::Connected);
        d.on_connection_state_observed(ConnectionState::Connected);

        assert!(d.topology().is_empty());
        assert_eq!(
            h.sim.take_calls(),
            vec![AdapterCall::DiscoverServices(DeviceId::from("B"))]
        );
        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::StateChanged {
                device: DeviceId::from("B")
            }]
        );

        // Same state again: nothing to announce, no second discovery.
        d.on_connection_state_observed(ConnectionState::Connected);
        assert!(h.sim.take_calls().is_empty());
        assert!(drain(&mut h.rx).is_empty());
    }

    #[test]
    fn test_name_change_detected_without_state_change() {
        let mut h = harness();
        let mut d = device(&h, "C", -70, Instant::now());

        h.sim.set_peripheral_state(d.identifier(), ConnectionState::Disconnected);
        h.sim.advertise(DeviceId::from("C"), -70, Some("Thermometer"));
        d.on_connection_state_observed(ConnectionState::Disconnected);

        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::NameChanged {
                device: DeviceId::from("C")
            }]
        );
        assert_eq!(d.name(), "Thermometer");
    }

    #[test]
    fn test_state_and_name_change_both_announced() {
        let mut h = harness();
        let mut d = device(&h, "C", -70, Instant::now());

        h.sim
            .set_peripheral_state(d.identifier(), ConnectionState::Connecting);
        d.on_advertisement_seen(Some(-70), Some("Lamp".to_string()), Instant::now());
        d.broadcast_state_change();

        let notifications = drain(&mut h.rx);
        assert_eq!(count(&notifications, crate::notify::Topic::StateChanged), 1);
        assert_eq!(count(&notifications, crate::notify::Topic::NameChanged), 1);
    }

    #[test]
    fn test_services_fan_out_to_characteristics_and_included() {
        let mut h = harness();
        let mut d = device(&h, "D", -70, Instant::now());
        let id = DeviceId::from("D");

        d.on_services_discovered(
            vec![service(1), service(2)],
            Some(Error::DiscoveryFailed {
                context: "partial".to_string(),
            }),
        );

        assert_eq!(d.topology().service_count(), 2);
        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::ServicesChanged { device: id.clone() }]
        );
        assert_eq!(
            h.sim.take_calls(),
            vec![
                AdapterCall::DiscoverCharacteristics(id.clone(), service(1)),
                AdapterCall::DiscoverCharacteristics(id.clone(), service(2)),
                AdapterCall::DiscoverIncludedServices(id.clone(), service(1)),
                AdapterCall::DiscoverIncludedServices(id, service(2)),
            ]
        );
    }

    #[test]
    fn test_characteristics_then_descriptors() {
        let mut h = harness();
        let mut d = device(&h, "D", -70, Instant::now());
        let id = DeviceId::from("D");
        let c1 = CharacteristicId::new(service(1), Uuid::from_u128(10));
        let c2 = CharacteristicId::new(service(1), Uuid::from_u128(11));

        d.on_characteristics_discovered(service(1), vec![c1, c2], None);
        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::CharacteristicsChanged {
                device: id.clone(),
                service: service(1)
            }]
        );
        assert_eq!(
            h.sim.take_calls(),
            vec![
                AdapterCall::DiscoverDescriptors(id.clone(), c1),
                AdapterCall::DiscoverDescriptors(id.clone(), c2),
            ]
        );

        d.on_descriptors_discovered(c1, vec![DescriptorId(Uuid::from_u128(0x2902))], None);
        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::DescriptorsChanged {
                device: id.clone(),
                service: service(1)
            }]
        );
        assert_eq!(d.topology().descriptors(&c1).len(), 1);

        d.on_included_services_discovered(service(1), vec![service(3)], None);
        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::IncludedServicesChanged {
                device: id,
                service: service(1)
            }]
        );
        assert_eq!(d.topology().included_services(&service(1)), vec![service(3)]);
    }

    #[test]
    fn test_failed_discovery_still_notifies_with_empty_result() {
        let mut h = harness();
        let mut d = device(&h, "D", -70, Instant::now());

        d.on_characteristics_discovered(
            service(1),
            Vec::new(),
            Some(Error::DiscoveryFailed {
                context: "timeout".to_string(),
            }),
        );
        assert_eq!(drain(&mut h.rx).len(), 1);
        assert!(d.topology().characteristics(&service(1)).is_empty());
        assert!(h.sim.take_calls().is_empty());
    }

    #[test]
    fn test_disconnect_is_idempotent_when_idle() {
        let mut h = harness();
        let mut d = device(&h, "E", -70, Instant::now());

        d.request_disconnect(Instant::now());
        d.request_disconnect(Instant::now());
        assert!(h.sim.take_calls().is_empty());
        assert!(drain(&mut h.rx).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_stops_polling_and_announces() {
        let mut h = harness();
        let now = Instant::now();
        let mut d = device(&h, "E", -70, now);
        d.request_connect(now);
        h.sim.take_calls();
        drain(&mut h.rx);

        let later = now + Duration::from_secs(1);
        d.request_disconnect(later);

        assert!(!d.is_polling_signal());
        assert_eq!(d.last_seen_at(), later);
        // Still Connecting when the poll stopped, so no state change yet;
        // the disconnect request then drops the pending link.
        assert_eq!(h.sim.take_calls(), vec![AdapterCall::Disconnect(DeviceId::from("E"))]);
        assert_eq!(d.connection_state(), ConnectionState::Disconnected);
        assert!(drain(&mut h.rx).is_empty());

        d.broadcast_state_change();
        assert_eq!(
            drain(&mut h.rx),
            vec![Notification::StateChanged {
                device: DeviceId::from("E")
            }]
        );
    }

    #[test]
    fn test_check_lost_requires_disconnected_and_stale() {
        let h = harness();
        let now = Instant::now();
        let mut d = device(&h, "F", -70, now);

        assert!(!d.check_lost(now + Duration::from_secs(5)));
        assert!(!d.check_lost(now + Duration::from_secs(10)));
        assert!(d.check_lost(now + Duration::from_millis(10_001)));

        h.sim
            .set_peripheral_state(d.identifier(), ConnectionState::Connected);
        assert!(!d.check_lost(now + Duration::from_secs(60)));

        h.sim
            .set_peripheral_state(d.identifier(), ConnectionState::Disconnecting);
        assert!(!d.check_lost(now + Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_connect_timeout_forces_disconnect() {
        let h = harness();
        let now = Instant::now();
        let mut d = device(&h, "G", -70, now);
        d.request_connect(now);
        h.sim.take_calls();

        assert!(!d.check_lost(now + Duration::from_secs(9)));
        assert!(h.sim.take_calls().is_empty());

        let timeout_at = now + Duration::from_secs(10);
        assert!(!d.check_lost(timeout_at));
        assert_eq!(h.sim.take_calls(), vec![AdapterCall::Disconnect(DeviceId::from("G"))]);
        assert!(!d.is_polling_signal());
        assert_eq!(d.connection_state(), ConnectionState::Disconnected);

        // Disconnected now, but the forced disconnect counted as activity.
        assert!(!d.check_lost(timeout_at + Duration::from_millis(500)));
        assert!(d.check_lost(timeout_at + Duration::from_secs(11)));
    }

    #[test]
    fn test_drop_releases_link() {
        let h = harness();
        let d = device(&h, "H", -70, Instant::now());
        h.sim
            .set_peripheral_state(d.identifier(), ConnectionState::Connected);

        drop(d);
        assert_eq!(
            h.sim.take_calls(),
            vec![
                AdapterCall::Disconnect(DeviceId::from("H")),
                AdapterCall::Forget(DeviceId::from("H")),
            ]
        );
    }

    #[test]
    fn test_disconnect_with_mock_adapter() {
        let mut mock = MockRadioAdapter::new();
        mock.expect_peripheral_name().returning(|_| None);
        mock.expect_peripheral_state()
            .returning(|_| ConnectionState::Connected);
        // Once on request, once more when the device is dropped.
        mock.expect_disconnect().times(2).return_const(());
        mock.expect_forget().times(1).return_const(());

        let h = harness_with(Arc::new(SimulatedAdapter::new()), Arc::new(mock));
        let mut d = device(&h, "I", -70, Instant::now());
        d.request_disconnect(Instant::now());
    }

    #[test]
    fn test_snapshot() {
        let h = harness();
        let now = Instant::now();
        let d = device(&h, "J", -45, now);
        let snapshot = d.snapshot(now + Duration::from_secs(2));

        assert_eq!(snapshot.identifier, DeviceId::from("J"));
        assert_eq!(snapshot.name, "unknown");
        assert_eq!(snapshot.signal_strength, Some(-45));
        assert_eq!(snapshot.last_seen_ago, Duration::from_secs(2));
        assert_eq!(snapshot.signal_bars(), 4);
    }

    fn connection_state() -> impl Strategy<Value = ConnectionState> {
        prop_oneof![
            Just(ConnectionState::Disconnected),
            Just(ConnectionState::Connecting),
            Just(ConnectionState::Connected),
            Just(ConnectionState::Disconnecting),
        ]
    }

    proptest! {
        #[test]
        fn prop_check_lost_iff_disconnected_and_stale(
            state in connection_state(),
            elapsed_ms in 0u64..60_000,
        ) {
            let h = harness();
            let now = Instant::now();
            let mut d = device(&h, "P", -70, now);
            h.sim.set_peripheral_state(d.identifier(), state);

            let lost = d.check_lost(now + Duration::from_millis(elapsed_ms));
            let expected = state == ConnectionState::Disconnected && elapsed_ms > 10_000;
            prop_assert_eq!(lost, expected);
        }

        #[test]
        fn prop_signal_notifications_match_distinct_changes(
            readings in proptest::collection::vec(-100i16..0, 1..40),
        ) {
            let mut h = harness();
            let mut d = device(&h, "Q", readings[0], Instant::now());

            let mut expected = 0;
            let mut previous = readings[0];
            for rssi in &readings {
                if *rssi != previous {
                    expected += 1;
                    previous = *rssi;
                }
                d.update_signal_strength(*rssi);
            }

            prop_assert_eq!(drain(&mut h.rx).len(), expected);
        }
    }
}
