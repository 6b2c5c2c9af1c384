//! Subscriber fan-out.
//!
//! Each subscriber owns its own unbounded channel, so a slow or dropped
//! broadcast consumer can never stall the mutating path. Publishing is
//! fire-and-forget: a failed send prunes the subscriber and nothing else.

use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use super::record::EventRecord;

/// Fan-out point for committed events.
#[derive(Debug, Default)]
pub struct EventPublisher {
    subscribers: RwLock<Vec<mpsc::UnboundedSender<Arc<EventRecord>>>>,
}

impl EventPublisher {
    /// Creates a publisher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving end.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber lock is poisoned.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<EventRecord>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .expect("subscriber lock poisoned")
            .push(tx);
        rx
    }

    /// Delivers a committed record to every live subscriber.
    ///
    /// Never blocks: sends go into per-subscriber queues. Subscribers whose
    /// receiving end has been dropped are pruned.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber lock is poisoned.
    pub fn publish(&self, record: &Arc<EventRecord>) {
        let mut subscribers = self.subscribers.write().expect("subscriber lock poisoned");
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(Arc::clone(record)).is_ok());
        let pruned = before - subscribers.len();
        if pruned > 0 {
            debug!(pruned, "dropped disconnected event subscribers");
        }
    }

    /// Number of live subscribers.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber lock is poisoned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber lock poisoned")
            .len()
    }
}
