//! Periodic ticks for the coordination task.
//!
//! Timers never touch registry state. Each scheduled task only enqueues a
//! [`Tick`] on the coordination channel, where it is serialized with adapter
//! events and commands. Every task is bound to a cancellation token owned by
//! the [`ScheduledTask`] handle, so dropping the handle stops the timer.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::ble::ids::DeviceId;
use crate::registry::Message;

/// Work item produced by a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Sweep the registry for lost devices.
    Expiry,
    /// Read the RSSI of a connecting/connected device.
    SignalPoll(DeviceId),
}

/// Creates timers that feed the coordination channel.
#[derive(Debug, Clone)]
pub(crate) struct Scheduler {
    tx: mpsc::UnboundedSender<Message>,
}

impl Scheduler {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    /// Enqueue `tick` every `period`, first after one full period.
    ///
    /// Requires a running Tokio runtime.
    pub(crate) fn schedule_repeating(&self, period: Duration, tick: Tick) -> ScheduledTask {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if tx.send(Message::Tick(tick.clone())).is_err() {
                            break;
                        }
                    }
                }
            }

            trace!("Timer for {:?} stopped", tick);
        });

        ScheduledTask { token }
    }
}

/// Handle to a periodic timer. Cancels the timer when dropped.
#[derive(Debug)]
pub(crate) struct ScheduledTask {
    token: CancellationToken,
}

impl ScheduledTask {
    /// Stop the timer.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Tick> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Message::Tick(tick) = message {
                out.push(tick);
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let _task = scheduler.schedule_repeating(Duration::from_millis(500), Tick::Expiry);

        tokio::time::sleep(Duration::from_millis(1_250)).await;
        assert_eq!(ticks(&mut rx), vec![Tick::Expiry, Tick::Expiry]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let id = DeviceId::from("A");
        let task = scheduler.schedule_repeating(Duration::from_millis(500), Tick::SignalPoll(id));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(ticks(&mut rx).len(), 1);

        drop(task);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(ticks(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_observable() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let task = scheduler.schedule_repeating(Duration::from_secs(1), Tick::Expiry);
        assert!(!task.is_cancelled());
        task.cancel();
        assert!(task.is_cancelled());
    }
}
