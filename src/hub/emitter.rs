use std::sync::Arc;

use super::{BroadcastEvent, BroadcastHub};

/// Publishes confirmed mutations to a wishlist's viewers.
///
/// Handlers call this only after the store has accepted the change.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    hub: Arc<BroadcastHub>,
}

impl EventEmitter {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }

    pub fn emit(&self, slug: &str, event: BroadcastEvent) {
        let delivered = self.hub.publish(slug, &event);
        tracing::debug!(topic = %slug, event = event.kind(), delivered, "Event emitted");
    }
}
