use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::{
    db_types::{MinPriceChange, Order},
    events::{
        EventHandler,
        EventProducer,
        Handler,
        MinPriceChangedEvent,
        OrderAnnulledEvent,
        OrderCompletedEvent,
    },
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_annulled_producer: Vec<EventProducer<OrderAnnulledEvent>>,
    pub order_completed_producer: Vec<EventProducer<OrderCompletedEvent>>,
    pub min_price_changed_producer: Vec<EventProducer<MinPriceChangedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_annulled(&self, orders: &[Order]) {
        for emitter in &self.order_annulled_producer {
            for order in orders {
                emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
            }
        }
    }

    pub async fn publish_order_completed(&self, order: &Order) {
        for emitter in &self.order_completed_producer {
            emitter.publish_event(OrderCompletedEvent::new(order.clone())).await;
        }
    }

    pub async fn publish_min_price_changes(&self, changes: &[MinPriceChange]) {
        if changes.is_empty() {
            return;
        }
        for emitter in &self.min_price_changed_producer {
            trace!("📬️ Notifying {} min price change(s)", changes.len());
            for change in changes {
                emitter.publish_event(MinPriceChangedEvent::new(change.clone())).await;
            }
        }
    }
}

pub struct EventHandlers {
    pub on_order_annulled: Option<EventHandler<OrderAnnulledEvent>>,
    pub on_order_completed: Option<EventHandler<OrderCompletedEvent>>,
    pub on_min_price_changed: Option<EventHandler<MinPriceChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_annulled = hooks.on_order_annulled.map(|f| EventHandler::new(buffer_size, f));
        let on_order_completed = hooks.on_order_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_min_price_changed = hooks.on_min_price_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_annulled, on_order_completed, on_min_price_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_annulled {
            result.order_annulled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_completed {
            result.order_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_min_price_changed {
            result.min_price_changed_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns every configured handler. Each one stops by itself once all of its producers are dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_annulled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_completed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_min_price_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_annulled: Option<Handler<OrderAnnulledEvent>>,
    pub on_order_completed: Option<Handler<OrderCompletedEvent>>,
    pub on_min_price_changed: Option<Handler<MinPriceChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_annulled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderAnnulledEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_annulled = Some(Arc::new(f));
        self
    }

    pub fn on_order_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCompletedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_order_completed = Some(Arc::new(f));
        self
    }

    pub fn on_min_price_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(MinPriceChangedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_min_price_changed = Some(Arc::new(f));
        self
    }
}
