//! Cache Events
//!
//! Lifecycle notifications delivered over a tokio broadcast channel.
//! Subscribers call `subscribe()` and drop the receiver to unsubscribe.
//! Closing the bus detaches every subscriber at once.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per subscriber before lagging receivers skip ahead
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Cache lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    /// Manager constructed and ready
    Connected { prefix: String },
    /// Key written
    Set { key: String },
    /// Live key removed by `del`
    Deleted { key: String },
    /// All entries dropped
    Cleared,
    /// One eviction cycle removed `count` entries
    Eviction { count: usize },
    /// One cleanup sweep removed `count` expired entries
    Cleanup { count: usize },
    /// An operation failed internally and returned a sentinel
    Error { operation: String, message: String },
    /// A prewarm loader failed for one key
    PrewarmError {
        pattern: String,
        key: String,
        message: String,
    },
    /// A prewarm cycle finished
    PrewarmCompleted { pattern: String, refreshed: usize },
}

/// Sending half owned by a manager.
///
/// The sender lives in a slot so `close()` can drop it; receivers then see
/// `Closed` and later emits go nowhere.
#[derive(Debug)]
pub struct EventBus {
    tx: Mutex<Option<broadcast::Sender<CacheEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    fn sender(&self) -> MutexGuard<'_, Option<broadcast::Sender<CacheEvent>>> {
        self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publishes an event; having no subscribers is fine.
    pub fn emit(&self, event: CacheEvent) {
        if let Some(tx) = self.sender().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Registers a receiver. After `close()` the receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        match self.sender().as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender().as_ref().map_or(0, |tx| tx.receiver_count())
    }

    /// Drops the sender, detaching every current subscriber.
    pub fn close(&self) {
        self.sender().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        bus.emit(CacheEvent::Cleared);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(CacheEvent::Set { key: "a".into() });
        bus.emit(CacheEvent::Deleted { key: "a".into() });

        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Set { key: "a".into() });
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Deleted { key: "a".into() });
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_string(&CacheEvent::Eviction { count: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"eviction","count":3}"#);
    }

    #[test]
    fn test_dropping_receiver_unsubscribes() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_close_detaches_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.close();
        bus.emit(CacheEvent::Cleared);

        assert!(bus.is_closed());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(rx.try_recv(), Err(broadcast::error::TryRecvError::Closed));
    }

    #[test]
    fn test_subscribe_after_close_is_closed() {
        let bus = EventBus::new();
        bus.close();

        let mut rx = bus.subscribe();
        assert_eq!(rx.try_recv(), Err(broadcast::error::TryRecvError::Closed));
    }
}
