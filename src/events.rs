use crate::model::{ActionSummary, MutationKind, ReplaySummary, ResourceKind};
use tokio::sync::broadcast;

/// Typed notification bus between the queue engine and UI surfaces.
///
/// Subscribers hold a receiver for as long as they are mounted and drop it to
/// detach; emitting with zero subscribers is not an error.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// A mutation was stored for later replay.
    ActionQueued {
        kind: MutationKind,
        resource: ResourceKind,
        message: String,
    },
    /// Pending records exist and a sync-review prompt should be considered.
    SyncAvailable { actions: Vec<ActionSummary> },
    ConnectionLost,
    ConnectionRestored,
    /// Aggregate outcome of a replay run.
    SyncFinished { summary: ReplaySummary },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: QueueEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(QueueEvent::ConnectionLost);
        assert!(matches!(rx.recv().await.unwrap(), QueueEvent::ConnectionLost));
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.emit(QueueEvent::ConnectionRestored);
    }
}
