mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{PriceBoostedEvent, RequestAcceptedEvent, RequestEventType, RequestExpiredEvent};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
