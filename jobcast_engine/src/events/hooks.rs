use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    PriceBoostedEvent,
    RequestAcceptedEvent,
    RequestExpiredEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub request_accepted_producer: Vec<EventProducer<RequestAcceptedEvent>>,
    pub price_boosted_producer: Vec<EventProducer<PriceBoostedEvent>>,
    pub request_expired_producer: Vec<EventProducer<RequestExpiredEvent>>,
}

pub struct EventHandlers {
    pub on_request_accepted: Option<EventHandler<RequestAcceptedEvent>>,
    pub on_price_boosted: Option<EventHandler<PriceBoostedEvent>>,
    pub on_request_expired: Option<EventHandler<RequestExpiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_request_accepted = hooks.on_request_accepted.map(|f| EventHandler::new(buffer_size, f));
        let on_price_boosted = hooks.on_price_boosted.map(|f| EventHandler::new(buffer_size, f));
        let on_request_expired = hooks.on_request_expired.map(|f| EventHandler::new(buffer_size, f));
        Self { on_request_accepted, on_price_boosted, on_request_expired }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_request_accepted {
            result.request_accepted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_price_boosted {
            result.price_boosted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_request_expired {
            result.request_expired_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_request_accepted {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_price_boosted {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_request_expired {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_request_accepted: Option<Handler<RequestAcceptedEvent>>,
    pub on_price_boosted: Option<Handler<PriceBoostedEvent>>,
    pub on_request_expired: Option<Handler<RequestExpiredEvent>>,
}

impl EventHooks {
    pub fn on_request_accepted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestAcceptedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_request_accepted = Some(Arc::new(f));
        self
    }

    pub fn on_price_boosted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PriceBoostedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_price_boosted = Some(Arc::new(f));
        self
    }

    pub fn on_request_expired<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestExpiredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_request_expired = Some(Arc::new(f));
        self
    }
}
