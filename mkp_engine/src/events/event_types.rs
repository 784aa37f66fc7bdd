use serde::{Deserialize, Serialize};

use crate::db_types::{MinPriceChange, Order, OrderStatusType};

/// An order left the `New` state without being completed, releasing its reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}

/// An order was completed and its quantities were written off the sellers' stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
}

impl OrderCompletedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A product's catalog minimum price changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinPriceChangedEvent {
    pub change: MinPriceChange,
}

impl MinPriceChangedEvent {
    pub fn new(change: MinPriceChange) -> Self {
        Self { change }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderAnnulled(OrderAnnulledEvent),
    OrderCompleted(OrderCompletedEvent),
    MinPriceChanged(MinPriceChangedEvent),
}
