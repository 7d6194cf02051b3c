//! Refresh triggers.

use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default capacity of the trigger queue.
pub const TRIGGER_QUEUE_CAPACITY: usize = 8;

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The user (or a timer acting for them) asked for a refresh
    Refresh,
    /// A session was just established
    Authenticated,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Refresh => f.write_str("refresh"),
            Trigger::Authenticated => f.write_str("authenticated"),
        }
    }
}

/// Sending side of the trigger queue.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<Trigger>,
}

impl TriggerHandle {
    /// Request a refresh without waiting.
    ///
    /// Returns `false` if the queue is full or closed. A full queue already
    /// holds pending refreshes, so dropping this one loses nothing.
    pub fn refresh(&self) -> bool {
        self.tx.try_send(Trigger::Refresh).is_ok()
    }

    /// Report an established session, waiting for queue space.
    ///
    /// Returns `false` if the queue is closed.
    pub async fn authenticated(&self) -> bool {
        self.tx.send(Trigger::Authenticated).await.is_ok()
    }

    /// Check if the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a trigger queue.
pub fn trigger_channel(capacity: usize) -> (TriggerHandle, mpsc::Receiver<Trigger>) {
    let (tx, rx) = mpsc::channel(capacity);
    (TriggerHandle { tx }, rx)
}

/// Request a refresh every `period` until the queue closes.
///
/// The first refresh fires one full period after the call.
pub fn spawn_periodic(handle: TriggerHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if handle.is_closed() {
                break;
            }
            if !handle.refresh() {
                tracing::debug!("Periodic refresh skipped, queue full");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refresh_is_delivered() {
        let (handle, mut rx) = trigger_channel(4);
        assert!(handle.refresh());
        assert!(handle.authenticated().await);

        assert_eq!(rx.recv().await, Some(Trigger::Refresh));
        assert_eq!(rx.recv().await, Some(Trigger::Authenticated));
    }

    #[tokio::test]
    async fn full_queue_drops_refresh() {
        let (handle, _rx) = trigger_channel(1);
        assert!(handle.refresh());
        assert!(!handle.refresh());
    }

    #[tokio::test]
    async fn closed_queue_is_reported() {
        let (handle, rx) = trigger_channel(1);
        drop(rx);
        assert!(handle.is_closed());
        assert!(!handle.refresh());
        assert!(!handle.authenticated().await);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_trigger_fires_each_period() {
        let (handle, mut rx) = trigger_channel(4);
        let task = spawn_periodic(handle, Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.recv().await, Some(Trigger::Refresh));

        task.abort();
    }

    #[test]
    fn trigger_display() {
        assert_eq!(Trigger::Refresh.to_string(), "refresh");
        assert_eq!(Trigger::Authenticated.to_string(), "authenticated");
    }
}
