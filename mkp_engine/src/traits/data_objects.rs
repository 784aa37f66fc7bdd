use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{MinPriceChange, Order, OrderLine, PricedProductReservation, StockBalance};

/// An offer together with how much of it is held by active reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OfferAvailability {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub offer: StockBalance,
    pub warehouse_name: String,
    pub reserved: i64,
    pub available: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferUpdateResult {
    pub offer: StockBalance,
    pub price_change: Option<MinPriceChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationResult {
    pub reservation: PricedProductReservation,
    /// What is left on the offer after this reservation
    pub available: i64,
    pub price_change: Option<MinPriceChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseResult {
    pub reservation: PricedProductReservation,
    pub price_change: Option<MinPriceChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryResult {
    pub expired_orders: Vec<Order>,
    pub released: Vec<PricedProductReservation>,
    pub price_changes: Vec<MinPriceChange>,
}

impl ExpiryResult {
    pub fn is_empty(&self) -> bool {
        self.expired_orders.is_empty() && self.released.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub price_changes: Vec<MinPriceChange>,
}

impl OrderResult {
    pub fn new(order: Order, lines: Vec<OrderLine>, price_changes: Vec<MinPriceChange>) -> Self {
        Self { order, lines, price_changes }
    }
}
