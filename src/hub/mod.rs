//! Live-viewer fan-out keyed by wishlist slug.
//!
//! Each connected viewer registers a [`Subscriber`] under its wishlist's topic.
//! Publishing serializes an event once and queues it on every subscriber of the
//! topic without waiting. A subscriber whose queue is closed or full is dropped
//! from the registry during that publish.
//!
//! ```text
//! request task                BroadcastHub                 connection tasks
//!     │                            │                              │
//!     ├─ publish("slug", E) ──────>│ snapshot subscribers         │
//!     │                            ├─ try_send ──────────────────>│ writer → socket
//!     │                            ├─ prune failed handles        │
//! ```

mod emitter;
mod events;

pub use emitter::EventEmitter;
pub use events::BroadcastEvent;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Topic → subscriber id → handle.
type Registry = HashMap<String, HashMap<Uuid, Subscriber>>;

/// Handle to one live connection's outbound queue.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: Uuid,
    tx: mpsc::Sender<Arc<str>>,
}

impl Subscriber {
    /// Create a handle and the receiving end its connection drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Process-wide registry of live subscribers.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    topics: Mutex<Registry>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // The registry holds no invariant a panicking holder could break halfway.
        self.topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `subscriber` under `topic`. Registering the same handle twice is a no-op.
    pub fn subscribe(&self, topic: &str, subscriber: Subscriber) {
        let id = subscriber.id;
        let mut topics = self.registry();
        topics
            .entry(topic.to_string())
            .or_default()
            .entry(id)
            .or_insert(subscriber);
        tracing::debug!(topic = %topic, subscriber = %id, "Subscribed");
    }

    /// Remove a subscriber, pruning the topic once it has none left.
    pub fn unsubscribe(&self, topic: &str, id: Uuid) {
        let mut topics = self.registry();
        if let Some(subscribers) = topics.get_mut(topic) {
            subscribers.remove(&id);
            if subscribers.is_empty() {
                topics.remove(topic);
            }
        }
        tracing::debug!(topic = %topic, subscriber = %id, "Unsubscribed");
    }

    /// Queue `event` for every current subscriber of `topic`.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, topic: &str, event: &BroadcastEvent) -> usize {
        let payload: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "Failed to serialize event");
                return 0;
            }
        };

        let snapshot: Vec<Subscriber> = match self.registry().get(topic) {
            Some(subscribers) => subscribers.values().cloned().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for subscriber in &snapshot {
            match subscriber.tx.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(topic = %topic, subscriber = %subscriber.id, "Subscriber queue full, dropping");
                    failed.push(subscriber.id);
                }
                Err(TrySendError::Closed(_)) => failed.push(subscriber.id),
            }
        }

        if !failed.is_empty() {
            let mut topics = self.registry();
            if let Some(subscribers) = topics.get_mut(topic) {
                for id in &failed {
                    subscribers.remove(id);
                }
                if subscribers.is_empty() {
                    topics.remove(topic);
                }
            }
            tracing::debug!(topic = %topic, pruned = failed.len(), "Pruned dead subscribers");
        }

        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry().get(topic).map_or(0, HashMap::len)
    }

    pub fn topic_count(&self) -> usize {
        self.registry().len()
    }
}
