//! Device registry.
//!
//! A [`Registry`] is a cheap, cloneable handle to a coordinator task that
//! exclusively owns the registry state. Adapter events, timer ticks and
//! commands from handles all arrive on one channel and are applied in the
//! order they were queued, so no device state is ever touched from two
//! places at once.

mod state;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ble::adapter::{AdapterEvent, RadioAdapter};
use crate::ble::btleplug_adapter::BtleplugAdapter;
use crate::ble::connection::RadioState;
use crate::ble::ids::DeviceId;
use crate::config::RegistryConfig;
use crate::data::DeviceSnapshot;
use crate::error::{Error, Result};
use crate::notify::{CallbackHandle, Notification, NotificationBus, RegistryId, Topic};
use crate::scheduler::Tick;

pub(crate) use state::RegistryCore;

/// Everything the coordinator task processes.
#[derive(Debug)]
pub(crate) enum Message {
    /// Completion or callback from the radio adapter.
    Adapter(AdapterEvent),
    /// Timer expiry.
    Tick(Tick),
    /// Request from a [`Registry`] handle.
    Command(Command),
}

/// Requests from [`Registry`] handles. Each carries its reply channel.
#[derive(Debug)]
pub(crate) enum Command {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    Connect {
        id: DeviceId,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        id: DeviceId,
        reply: oneshot::Sender<Result<()>>,
    },
    Devices(oneshot::Sender<Vec<DeviceSnapshot>>),
    Device {
        id: DeviceId,
        reply: oneshot::Sender<Option<DeviceSnapshot>>,
    },
    Identifiers(oneshot::Sender<Vec<DeviceId>>),
    RadioState(oneshot::Sender<RadioState>),
    IsRunning(oneshot::Sender<bool>),
    IsScanning(oneshot::Sender<bool>),
    DeviceCount(oneshot::Sender<usize>),
    /// Stop, release every device and end the coordinator. `None` when sent
    /// from a dropped handle.
    Shutdown(Option<oneshot::Sender<()>>),
}

struct RegistryInner {
    id: RegistryId,
    tx: mpsc::UnboundedSender<Message>,
    bus: NotificationBus,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        // Fails only if the coordinator already ended.
        let _ = self.tx.send(Message::Command(Command::Shutdown(None)));
    }
}

/// Handle to a running device registry.
///
/// Clones share the same registry. When the last handle is dropped the
/// registry shuts down in the background; call [`shutdown`](Self::shutdown)
/// to wait for it instead.
///
/// # Example
///
/// ```rust,no_run
/// use ble_device_registry::{Registry, RegistryConfig, Result};
///
/// # async fn example() -> Result<()> {
/// let registry = Registry::with_btleplug(RegistryConfig::default()).await?;
/// registry.start().await?;
///
/// for device in registry.devices().await? {
///     println!("{} {} {:?}", device.identifier, device.name, device.signal_strength);
/// }
///
/// registry.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Create a registry over the given adapter.
    ///
    /// The coordinator task is spawned on the current Tokio runtime. The
    /// registry starts stopped; call [`start`](Self::start) to begin
    /// scanning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the configuration is invalid.
    pub fn new(adapter: Arc<dyn RadioAdapter>, config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let id = RegistryId::new();
        let bus = NotificationBus::new(config.notification_capacity);
        let (tx, rx) = mpsc::unbounded_channel();

        let core = RegistryCore::new(id, adapter, bus.clone(), tx.clone(), Arc::new(config));
        let task = tokio::spawn(run_coordinator(core, rx));

        debug!("Created registry {}", id);

        Ok(Self {
            inner: Arc::new(RegistryInner {
                id,
                tx,
                bus,
                task: Mutex::new(Some(task)),
            }),
        })
    }

    /// Create a registry over the system's first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BluetoothUnavailable`] if no adapter is present.
    pub async fn with_btleplug(config: RegistryConfig) -> Result<Self> {
        let adapter = BtleplugAdapter::new().await?;
        Self::new(Arc::new(adapter), config)
    }

    /// Identity carried by this registry's notifications.
    pub fn id(&self) -> RegistryId {
        self.inner.id
    }

    // === Lifecycle ===

    /// Start scanning. No-op if already running.
    ///
    /// Devices left over from a previous run are dropped unless connected.
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// Stop scanning. No-op if not running.
    ///
    /// Connected devices stay in the registry; everything else is dropped.
    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    /// Stop, disconnect every device and end the coordinator.
    ///
    /// Calling this on a registry that has already shut down is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down registry {}", self.inner.id);

        let (tx, rx) = oneshot::channel();
        if self
            .inner
            .tx
            .send(Message::Command(Command::Shutdown(Some(tx))))
            .is_ok()
        {
            let _ = rx.await;
        }

        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }

        Ok(())
    }

    // === Connections ===

    /// Ask a device to connect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BluetoothUnavailable`] unless the radio is powered
    /// on, or [`Error::DeviceNotFound`] for an unknown identifier.
    pub async fn connect(&self, id: &DeviceId) -> Result<()> {
        let id = id.clone();
        self.request(|reply| Command::Connect { id, reply }).await?
    }

    /// Ask a device to disconnect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for an unknown identifier.
    pub async fn disconnect(&self, id: &DeviceId) -> Result<()> {
        let id = id.clone();
        self.request(|reply| Command::Disconnect { id, reply }).await?
    }

    // === Queries ===

    /// Snapshots of all listed devices, sorted by identifier.
    pub async fn devices(&self) -> Result<Vec<DeviceSnapshot>> {
        self.request(Command::Devices).await
    }

    /// Identifiers of all listed devices, sorted.
    pub async fn identifiers(&self) -> Result<Vec<DeviceId>> {
        self.request(Command::Identifiers).await
    }

    /// Snapshot of one device, listed or not.
    pub async fn device(&self, id: &DeviceId) -> Result<Option<DeviceSnapshot>> {
        let id = id.clone();
        self.request(|reply| Command::Device { id, reply }).await
    }

    /// Last radio state the adapter reported.
    pub async fn radio_state(&self) -> Result<RadioState> {
        self.request(Command::RadioState).await
    }

    /// Check if the registry is started.
    pub async fn is_running(&self) -> Result<bool> {
        self.request(Command::IsRunning).await
    }

    /// Check if the radio is scanning.
    pub async fn is_scanning(&self) -> Result<bool> {
        self.request(Command::IsScanning).await
    }

    /// Number of devices held, including unlisted ones.
    pub async fn device_count(&self) -> Result<usize> {
        self.request(Command::DeviceCount).await
    }

    // === Notifications ===

    /// Subscribe to every notification.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.bus.subscribe()
    }

    /// Register a callback for every notification.
    pub fn on_notification<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.inner.bus.on_notification(callback)
    }

    /// Register a callback for one topic.
    pub fn on_topic<F>(&self, topic: Topic, callback: F) -> CallbackHandle
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        self.inner.bus.on_topic(topic, callback)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .tx
            .send(Message::Command(command(tx)))
            .map_err(|_| Error::RegistryClosed)?;
        rx.await.map_err(|_| Error::RegistryClosed)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.inner.id)
            .field("bus", &self.inner.bus)
            .finish()
    }
}

/// Apply messages to the core until shutdown.
async fn run_coordinator(mut core: RegistryCore, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = rx.recv().await {
        let now = Instant::now();
        match message {
            Message::Adapter(event) => core.handle_adapter_event(event, now),
            Message::Tick(tick) => core.handle_tick(tick, now),
            Message::Command(Command::Shutdown(reply)) => {
                core.shutdown(now);
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                break;
            }
            Message::Command(command) => core.handle_command(command, now),
        }
    }

    debug!("Registry coordinator ended");
}
