//! Change notifications.
//!
//! The registry and its devices announce every observable change on a
//! [`NotificationBus`]. A notification names what changed and who changed
//! it, nothing more; subscribers re-query the registry for current values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::ble::ids::{DeviceId, ServiceId};

/// Identity of a registry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegistryId(Uuid);

impl RegistryId {
    /// Generate a fresh registry identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RegistryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RegistryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification topics, without sender identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Registry membership changed.
    DevicesChanged,
    /// Radio power state changed.
    RadioStateChanged,
    /// A device's name changed.
    NameChanged,
    /// A device's connection state changed.
    StateChanged,
    /// A device's RSSI changed.
    SignalStrengthChanged,
    /// A device's service list changed.
    ServicesChanged,
    /// Characteristics of one service changed.
    CharacteristicsChanged,
    /// Included services of one service changed.
    IncludedServicesChanged,
    /// Descriptors under one service changed.
    DescriptorsChanged,
}

/// A change announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Devices were added to or removed from the registry.
    DevicesChanged {
        /// The registry whose membership changed.
        registry: RegistryId,
    },
    /// The radio state was (re)evaluated.
    RadioStateChanged {
        /// The registry that observed the change.
        registry: RegistryId,
    },
    /// A device's name changed.
    NameChanged {
        /// The device.
        device: DeviceId,
    },
    /// A device's connection state changed.
    StateChanged {
        /// The device.
        device: DeviceId,
    },
    /// A device's signal strength changed.
    SignalStrengthChanged {
        /// The device.
        device: DeviceId,
    },
    /// A device's services were (re)discovered.
    ServicesChanged {
        /// The device.
        device: DeviceId,
    },
    /// Characteristics of a service were discovered.
    CharacteristicsChanged {
        /// The device.
        device: DeviceId,
        /// The service searched.
        service: ServiceId,
    },
    /// Included services of a service were discovered.
    IncludedServicesChanged {
        /// The device.
        device: DeviceId,
        /// The service searched.
        service: ServiceId,
    },
    /// Descriptors of a characteristic were discovered.
    DescriptorsChanged {
        /// The device.
        device: DeviceId,
        /// The service owning the characteristic.
        service: ServiceId,
    },
}

impl Notification {
    /// The topic of this notification.
    pub fn topic(&self) -> Topic {
        match self {
            Self::DevicesChanged { .. } => Topic::DevicesChanged,
            Self::RadioStateChanged { .. } => Topic::RadioStateChanged,
            Self::NameChanged { .. } => Topic::NameChanged,
            Self::StateChanged { .. } => Topic::StateChanged,
            Self::SignalStrengthChanged { .. } => Topic::SignalStrengthChanged,
            Self::ServicesChanged { .. } => Topic::ServicesChanged,
            Self::CharacteristicsChanged { .. } => Topic::CharacteristicsChanged,
            Self::IncludedServicesChanged { .. } => Topic::IncludedServicesChanged,
            Self::DescriptorsChanged { .. } => Topic::DescriptorsChanged,
        }
    }

    /// The sending device, for device-level notifications.
    pub fn device(&self) -> Option<&DeviceId> {
        match self {
            Self::DevicesChanged { .. } | Self::RadioStateChanged { .. } => None,
            Self::NameChanged { device }
            | Self::StateChanged { device }
            | Self::SignalStrengthChanged { device }
            | Self::ServicesChanged { device }
            | Self::CharacteristicsChanged { device, .. }
            | Self::IncludedServicesChanged { device, .. }
            | Self::DescriptorsChanged { device, .. } => Some(device),
        }
    }

    /// The sending registry, for registry-level notifications.
    pub fn registry(&self) -> Option<RegistryId> {
        match self {
            Self::DevicesChanged { registry } | Self::RadioStateChanged { registry } => {
                Some(*registry)
            }
            _ => None,
        }
    }

    /// The service the notification is scoped to, if any.
    pub fn service(&self) -> Option<ServiceId> {
        match self {
            Self::CharacteristicsChanged { service, .. }
            | Self::IncludedServicesChanged { service, .. }
            | Self::DescriptorsChanged { service, .. } => Some(*service),
            _ => None,
        }
    }
}

/// Callback handle for unregistering callbacks.
///
/// Dropping the handle unregisters the callback.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    /// Create a new callback handle.
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

impl std::fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle").field("id", &self.id).finish()
    }
}

/// Publish/subscribe channel for [`Notification`]s.
#[derive(Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<Notification>,
    callback_counter: Arc<AtomicU64>,
}

impl NotificationBus {
    /// Create a bus buffering up to `capacity` notifications per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. `RegistryConfig::validate` rejects that.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            callback_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish a notification to all current subscribers.
    pub(crate) fn publish(&self, notification: Notification) {
        trace!("Publishing {:?}", notification);
        // No subscribers is not an error.
        let _ = self.tx.send(notification);
    }

    /// Subscribe to every notification.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Register a callback for every notification.
    ///
    /// The callback runs on a Tokio task; a runtime must be active.
    pub fn on_notification<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.spawn_callback(None, callback)
    }

    /// Register a callback for a single topic.
    pub fn on_topic<F>(&self, topic: Topic, callback: F) -> CallbackHandle
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.spawn_callback(Some(topic), callback)
    }

    fn spawn_callback<F>(&self, topic: Option<Topic>, callback: F) -> CallbackHandle
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => {
                        if topic.map_or(true, |t| t == notification.topic()) {
                            callback(notification);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Notification callback {} lagged, skipped {}", callback_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

/// Drain everything currently queued on a receiver.
#[cfg(test)]
pub(crate) fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}
