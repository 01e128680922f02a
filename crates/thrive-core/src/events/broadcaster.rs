use std::sync::Arc;

use tokio::sync::broadcast;

use super::types::{RealtimeEvent, RealtimeEventKind};

/// Events beyond this limit are dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Cloneable handle to the realtime event channel.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publishes an event. Returns how many subscribers received it; having
    /// none is not an error.
    pub fn send(&self, event: RealtimeEvent) -> usize {
        let kind = event.kind;
        let delivered = self.sender.send(event).unwrap_or_default();
        tracing::trace!(event = %kind, delivered, "realtime event published");
        delivered
    }

    pub fn publish<T: serde::Serialize>(
        &self,
        user_id: uuid::Uuid,
        kind: RealtimeEventKind,
        entity_id: impl ToString,
        entity: &T,
    ) -> usize {
        self.send(RealtimeEvent::for_entity(user_id, kind, entity_id, entity))
    }

    /// Only events sent after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
