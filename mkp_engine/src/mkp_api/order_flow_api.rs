use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderLine, OrderStatusType},
    events::EventProducers,
    helpers::DEFAULT_RESERVATION_TTL,
    mkp_api::order_objects::{FullOrder, OrderQueryFilter},
    traits::{OrderFlowError, OrderManagement, OrderResult},
};

/// `OrderFlowApi` places orders and drives them through their life cycle, publishing events for every committed
/// transition.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    ttl: Duration,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, ttl: DEFAULT_RESERVATION_TTL }
    }

    /// How long an order's reservations are held before the order expires.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Places an order against a single seller, reserving every line.
    pub async fn place_order(&self, order: NewOrder) -> Result<OrderResult, OrderFlowError> {
        let customer_id = order.customer_id;
        let result = self.db.place_order(order, self.ttl, Utc::now()).await?;
        info!(
            "🔄️📦️ Order #{} placed by customer {customer_id}: {} lines, total {}",
            result.order.id,
            result.lines.len(),
            result.order.total_price
        );
        self.producers.publish_min_price_changes(&result.price_changes).await;
        Ok(result)
    }

    pub async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order(id).await
    }

    pub async fn fetch_full_order(&self, id: i64) -> Result<Option<FullOrder>, OrderFlowError> {
        let Some(order) = self.db.fetch_order(id).await? else {
            return Ok(None);
        };
        let lines = self.db.fetch_order_lines(id).await?;
        Ok(Some(FullOrder::new(order, lines)))
    }

    pub async fn order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError> {
        self.db.fetch_order_lines(order_id).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    pub async fn cancel_order(&self, id: i64) -> Result<OrderResult, OrderFlowError> {
        self.modify_status_for_order(id, OrderStatusType::Cancelled).await
    }

    pub async fn complete_order(&self, id: i64) -> Result<OrderResult, OrderFlowError> {
        self.modify_status_for_order(id, OrderStatusType::Completed).await
    }

    /// Changes the status of an order.
    ///
    /// Only `New` orders can change status:
    ///
    /// | From \ To | New       | Completed | Cancelled | Expired |
    /// |-----------|-----------|-----------|-----------|---------|
    /// | New       | Err no-op | 1         | 2         | 2       |
    /// | others    | Err       | Err       | Err       | Err     |
    ///
    /// 1. The ordered quantities are written off the offers and the order's reservations are deleted. Not allowed
    ///    once the order is past its expiry.
    /// 2. The order's reservations are deleted, returning the stock to the offers.
    ///
    /// In every case the minimum price of the affected products is recomputed and subscribers are notified.
    pub async fn modify_status_for_order(
        &self,
        id: i64,
        new_status: OrderStatusType,
    ) -> Result<OrderResult, OrderFlowError> {
        let order = self.db.fetch_order(id).await?.ok_or(OrderFlowError::OrderNotFound(id))?;
        if order.status != OrderStatusType::New {
            warn!("🔄️ Order #{id} cannot move from {} to {new_status}", order.status);
            return Err(OrderFlowError::OrderModificationForbidden { id, from: order.status, to: new_status });
        }
        let now = Utc::now();
        let result = match new_status {
            OrderStatusType::New => return Err(OrderFlowError::OrderModificationNoOp),
            OrderStatusType::Completed => {
                let result = self.db.complete_order(id, now).await?;
                self.producers.publish_order_completed(&result.order).await;
                result
            },
            OrderStatusType::Cancelled | OrderStatusType::Expired => {
                let result = self.db.annul_order(id, new_status, now).await?;
                self.producers.publish_order_annulled(std::slice::from_ref(&result.order)).await;
                result
            },
        };
        info!("🔄️ Order #{id} is now {}", result.order.status);
        self.producers.publish_min_price_changes(&result.price_changes).await;
        Ok(result)
    }
}
