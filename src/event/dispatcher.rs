use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::{
    bus::EventBus,
    events::ResultWrittenEvent,
    handler::{EventError, EventHandler},
};

const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 30_000;

/// Delivers events from the bus to every registered handler.
///
/// Each delivery runs in its own task, so events for different races proceed in
/// parallel and one failing handler does not hold up the others. Retries with
/// exponential backoff apply to retryable errors and timeouts only.
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
    event_bus: EventBus,
    handler_timeout: Duration,
    max_retries: u32,
}

impl EventDispatcher {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            handlers: Vec::new(),
            event_bus,
            handler_timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    /// The handler will start receiving events once `start_listening` is called.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        info!(handler_name = handler.name(), "Registering event handler");
        self.handlers.push(handler);
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Subscribes to the bus and spawns the delivery loop.
    ///
    /// The subscription is taken before this returns, so events emitted afterwards
    /// are never missed. The loop ends when every bus handle is dropped.
    pub async fn start_listening(self) {
        let handlers = self.handlers;
        let mut receiver = self.event_bus.subscribe();
        let handler_timeout = self.handler_timeout;
        let max_retries = self.max_retries;

        info!(
            handler_count = handlers.len(),
            timeout_ms = handler_timeout.as_millis() as u64,
            max_retries = max_retries,
            "Starting event dispatcher"
        );

        tokio::spawn(async move {
            loop {
                let event = match receiver.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Dropped races keep their old scores until their next result write
                        error!(
                            skipped,
                            "Event dispatcher lagged, result events were dropped; raise EVENT_BUS_CAPACITY"
                        );
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                debug!(
                    event_type = event.event_type(),
                    race_id = event.race_id(),
                    "Dispatching event to {} handlers",
                    handlers.len()
                );

                for handler in &handlers {
                    let event = event.clone();
                    let handler = handler.clone();

                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_with_retry(handler, event, handler_timeout, max_retries)
                                .await
                        {
                            error!(error = ?e, "Handler failed permanently");
                        }
                    });
                }
            }

            info!("Event dispatcher stopped listening");
        });
    }

    async fn handle_with_retry(
        handler: Arc<dyn EventHandler>,
        event: ResultWrittenEvent,
        handler_timeout: Duration,
        max_retries: u32,
    ) -> Result<(), EventError> {
        let handler_name = handler.name();
        let event_type = event.event_type();
        let race_id = event.race_id();

        let mut attempt = 0;
        loop {
            let error = match timeout(handler_timeout, handler.handle(&event)).await {
                Ok(Ok(())) => {
                    if attempt > 0 {
                        info!(
                            handler = handler_name,
                            event_type = event_type,
                            race_id = race_id,
                            attempt = attempt + 1,
                            "Handler succeeded after retry"
                        );
                    }
                    return Ok(());
                }
                Ok(Err(e)) => e,
                Err(_elapsed) => EventError::Timeout,
            };

            if !error.is_retryable() || attempt >= max_retries {
                error!(
                    handler = handler_name,
                    event_type = event_type,
                    race_id = race_id,
                    attempt = attempt + 1,
                    error = ?error,
                    "Handler failed permanently"
                );
                return Err(error);
            }

            warn!(
                handler = handler_name,
                event_type = event_type,
                race_id = race_id,
                attempt = attempt + 1,
                error = ?error,
                "Handler failed, will retry"
            );

            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
        }
    }
}

/// Exponential backoff from `BASE_BACKOFF_MS`, capped at `MAX_BACKOFF_MS`
fn backoff_delay(attempt: u32) -> Duration {
    let millis = 2_u64
        .checked_pow(attempt)
        .and_then(|factor| factor.checked_mul(BASE_BACKOFF_MS))
        .map_or(MAX_BACKOFF_MS, |millis| millis.min(MAX_BACKOFF_MS));
    Duration::from_millis(millis)
}
