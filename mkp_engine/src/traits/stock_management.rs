use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{MinPriceChange, Money, NewStockBalance, OrderStatusType, StockBalance},
    traits::data_objects::{OfferAvailability, OfferUpdateResult},
};

/// Price offers and the catalog minimum price they determine.
///
/// Availability is always evaluated at the `now` the caller supplies: a reservation only counts against an offer while
/// its `expires_at` is later than `now`.
#[allow(async_fn_in_trait)]
pub trait StockManagement: Clone {
    /// Creates the offer for `(warehouse_id, product_id)`, or replaces its price and amount if it exists.
    ///
    /// The warehouse must belong to the organization and the product must exist. The product's minimum price is
    /// recomputed in the same transaction.
    async fn upsert_stock_balance(
        &self,
        offer: NewStockBalance,
        now: DateTime<Utc>,
    ) -> Result<OfferUpdateResult, StockError>;

    async fn fetch_stock_balance(&self, id: i64) -> Result<Option<StockBalance>, StockError>;

    async fn offers_for_organization(
        &self,
        organization_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<OfferAvailability>, StockError>;

    /// Every offer of the product with its availability. Fails with `ProductNotFound` for unknown products.
    async fn offers_for_product(
        &self,
        product_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<OfferAvailability>, StockError>;

    /// Withdraws an offer. Not allowed while it has active reservations.
    async fn remove_stock_balance(&self, id: i64, now: DateTime<Utc>) -> Result<OfferUpdateResult, StockError>;

    /// Recomputes the product's minimum price from the offers that have stock available at `now`.
    ///
    /// Returns the change if the stored price was different.
    async fn update_product_min_price(
        &self,
        product_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<MinPriceChange>, StockError>;
}

#[derive(Debug, Clone, Error)]
pub enum StockError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Quantity must be positive, but was {0}")]
    InvalidQuantity(i64),
    #[error("Stock amount cannot be negative, but was {0}")]
    InvalidAmount(i64),
    #[error("Price cannot be negative, but was {0}")]
    InvalidPrice(Money),
    #[error("Price offer {0} does not exist")]
    OfferNotFound(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Warehouse {0} does not exist")]
    WarehouseNotFound(i64),
    #[error("Warehouse {warehouse_id} does not belong to organization {organization_id}")]
    WarehouseNotOwned { warehouse_id: i64, organization_id: i64 },
    #[error("Price offer {offer_id} is for product {offer_product_id}, not product {requested_product_id}")]
    ProductMismatch { offer_id: i64, offer_product_id: i64, requested_product_id: i64 },
    #[error("Insufficient stock on offer {offer_id}: requested {requested}, available {available}")]
    InsufficientStock { offer_id: i64, requested: i64, available: i64 },
    #[error("Price offer {0} still has active reservations")]
    OfferHasReservations(i64),
    #[error("Reservation {0} does not exist")]
    ReservationNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {order_id} is {status} and cannot hold reservations")]
    OrderClosed { order_id: i64, status: OrderStatusType },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<sqlx::Error> for StockError {
    fn from(e: sqlx::Error) -> Self {
        StockError::DatabaseError(e.to_string())
    }
}
