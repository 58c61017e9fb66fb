//! Notification bus for broadcasting core changes to subscribers.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::notification::Notification;

const LOG: &str = "notification_bus";

/// Default channel capacity for the notification bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcast bus delivering [`Notification`]s to all subscribers.
///
/// Notifications are delivered asynchronously and, per publisher, in publish
/// order. A subscriber that falls too far behind loses the oldest entries
/// and is told how many were skipped.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Arc<Notification>>,
    capacity: usize,
}

impl NotificationBus {
    /// Create a bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish a notification to all subscribers.
    ///
    /// Returns the number of receivers that got it. Zero receivers is fine.
    pub fn publish(&self, notification: Notification) -> usize {
        trace!(target: LOG, kind = notification.kind(), "publishing notification");
        self.sender.send(Arc::new(notification)).unwrap_or(0)
    }

    /// Subscribe to all future notifications.
    #[must_use]
    pub fn subscribe(&self) -> NotificationReceiver {
        NotificationReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// The number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// The channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of the notification bus.
pub struct NotificationReceiver {
    receiver: broadcast::Receiver<Arc<Notification>>,
}

impl NotificationReceiver {
    /// Receive the next notification.
    ///
    /// Returns `None` when the bus is gone. A lagged receiver skips the lost
    /// entries and keeps going.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(target: LOG, skipped = count, "notification receiver lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive without blocking; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Arc<Notification>> {
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(target: LOG, skipped = count, "notification receiver lagged");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// Drain everything currently queued.
    pub fn drain(&mut self) -> Vec<Arc<Notification>> {
        let mut drained = Vec::new();
        while let Some(notification) = self.try_recv() {
            drained.push(notification);
        }
        drained
    }
}
