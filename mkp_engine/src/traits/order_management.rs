use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderLine, OrderStatusType},
    mkp_api::order_objects::OrderQueryFilter,
    traits::{data_objects::OrderResult, StockError},
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Places an order against a single seller.
    ///
    /// In one transaction: the order is inserted with status `New`, every line reserves its quantity under a key that
    /// carries the order id, unit prices are captured from the offers and the order total is stored. If any line cannot
    /// be reserved, nothing is written.
    async fn place_order(
        &self,
        order: NewOrder,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<OrderResult, OrderFlowError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    /// Moves a `New` order to `Cancelled` or `Expired` and releases its reservations.
    async fn annul_order(
        &self,
        id: i64,
        status: OrderStatusType,
        now: DateTime<Utc>,
    ) -> Result<OrderResult, OrderFlowError>;

    /// Moves a `New` order to `Completed`, writes the ordered quantities off the offers and releases the reservations.
    ///
    /// Orders that are past their expiry cannot be completed.
    async fn complete_order(&self, id: i64, now: DateTime<Utc>) -> Result<OrderResult, OrderFlowError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("An order must have at least one line")]
    EmptyOrder,
    #[error("All lines of an order must be offered by the same organization")]
    MixedSellers,
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {id} cannot change from {from} to {to}")]
    OrderModificationForbidden { id: i64, from: OrderStatusType, to: OrderStatusType },
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("Order {0} has expired")]
    OrderExpired(i64),
    #[error("The offer for line {line_id} of order {order_id} has been withdrawn")]
    OfferWithdrawn { order_id: i64, line_id: i64 },
    #[error("The order total does not fit in the supported price range")]
    TotalOverflow,
    #[error("{0}")]
    Stock(#[from] StockError),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
