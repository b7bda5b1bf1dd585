use tokio::sync::broadcast;
use tracing::debug;

use super::events::ResultWrittenEvent;

const DEFAULT_CAPACITY: usize = 1000;

/// Event bus for distributing result mutations to subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ResultWrittenEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` undelivered events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Emits an event to all current subscribers
    pub fn emit(&self, event: ResultWrittenEvent) {
        let race_id = event.race_id.clone();
        let event_type = event.event_type();

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    race_id = %race_id,
                    event_type,
                    receivers = receiver_count,
                    "Event emitted"
                );
            }
            Err(_) => {
                debug!(race_id = %race_id, event_type, "Event emitted with no receivers");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResultWrittenEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
