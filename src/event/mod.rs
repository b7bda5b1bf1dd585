// Result-written trigger plumbing
//
// The bus carries one event per result mutation; the dispatcher delivers it to
// every registered handler with the delivery-side timeout and retry policy.

pub use bus::EventBus;
pub use dispatcher::EventDispatcher;
pub use events::ResultWrittenEvent;
pub use handler::{EventError, EventHandler};

mod bus;
mod dispatcher;
mod events;
mod handler;
