//! Row types and the small value types that travel with them.
//!
//! Everything here maps 1:1 onto a table (or a column type) in the SQLite schema, so the structs derive `FromRow` and
//! are returned from the backend traits unchanged.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use mkp_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        Role           ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Places orders and holds reservations
    Customer,
    /// Staff of a seller organization. Manages the organization's warehouses and offers.
    Seller,
    /// Marketplace operator. Manages the catalog and may act on any order.
    Manager,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Seller => write!(f, "seller"),
            Role::Manager => write!(f, "manager"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "seller" => Ok(Self::Seller),
            "manager" => Ok(Self::Manager),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------    Organization       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Warehouse        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub organization_id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewWarehouse {
    pub fn new<S: Into<String>>(organization_id: i64, name: S) -> Self {
        Self { organization_id, name: name.into(), address: None }
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Warehouse {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Product         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
}

impl NewProduct {
    pub fn new<S1: Into<String>, S2: Into<String>>(sku: S1, name: S2) -> Self {
        Self { sku: sku.into(), name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    /// The cheapest price among the product's offers that still have available quantity. `None` when nothing is
    /// available.
    pub min_price: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     StockBalance      ---------------------------------------------------------
/// The payload for creating or replacing a seller's offer of a product at a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockBalance {
    pub organization_id: i64,
    pub warehouse_id: i64,
    pub product_id: i64,
    pub price: Money,
    pub amount: i64,
}

impl NewStockBalance {
    pub fn new(organization_id: i64, warehouse_id: i64, product_id: i64, price: Money, amount: i64) -> Self {
        Self { organization_id, warehouse_id, product_id, price, amount }
    }
}

/// A seller's priced, quantified listing of a product at a specific warehouse (a "price offer").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StockBalance {
    pub id: i64,
    pub organization_id: i64,
    pub warehouse_id: i64,
    pub product_id: i64,
    pub price: Money,
    /// Physical quantity. Reservations do not change this; completing an order does.
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     Reservations      ---------------------------------------------------------
/// Identifies a reservation. Two reserve calls with equal keys update the same row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationKey {
    pub price_offer_id: i64,
    pub product_id: i64,
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub offer_id: Option<i64>,
    #[serde(default)]
    pub request_product_id: Option<i64>,
    #[serde(default)]
    pub offer_product_id: Option<i64>,
}

impl ReservationKey {
    pub fn new(price_offer_id: i64, product_id: i64) -> Self {
        Self { price_offer_id, product_id, ..Default::default() }
    }

    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_offer_id(mut self, offer_id: i64) -> Self {
        self.offer_id = Some(offer_id);
        self
    }

    pub fn with_request_product_id(mut self, request_product_id: i64) -> Self {
        self.request_product_id = Some(request_product_id);
        self
    }

    pub fn with_offer_product_id(mut self, offer_product_id: i64) -> Self {
        self.offer_product_id = Some(offer_product_id);
        self
    }
}

impl Display for ReservationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn opt(v: Option<i64>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
        }
        write!(
            f,
            "offer {} / product {} / order {} / offer {} / request product {} / offer product {}",
            self.price_offer_id,
            self.product_id,
            opt(self.order_id),
            opt(self.offer_id),
            opt(self.request_product_id),
            opt(self.offer_product_id)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    #[serde(flatten)]
    pub key: ReservationKey,
    /// The total quantity to hold under this key. Re-reserving replaces the previous quantity rather than adding to it.
    pub count: i64,
}

impl NewReservation {
    pub fn new(key: ReservationKey, count: i64) -> Self {
        Self { key, count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PricedProductReservation {
    pub id: i64,
    pub price_offer_id: i64,
    pub product_id: i64,
    pub order_id: Option<i64>,
    pub offer_id: Option<i64>,
    pub request_product_id: Option<i64>,
    pub offer_product_id: Option<i64>,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricedProductReservation {
    pub fn key(&self) -> ReservationKey {
        ReservationKey {
            price_offer_id: self.price_offer_id,
            product_id: self.product_id,
            order_id: self.order_id,
            offer_id: self.offer_id,
            request_product_id: self.request_product_id,
            offer_product_id: self.offer_product_id,
        }
    }

    /// A reservation only holds stock while `expires_at` lies in the future.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum OrderStatusType {
    /// The order has been placed and its stock is reserved.
    New,
    /// The seller has shipped the order. Stock has been written off.
    Completed,
    /// The order was cancelled by the customer or a manager.
    Cancelled,
    /// The order's reservations lapsed before it was completed.
    Expired,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "New"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
            OrderStatusType::Expired => write!(f, "Expired"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to New");
            OrderStatusType::New
        })
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(Self::New),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Orders         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub price_offer_id: i64,
    pub quantity: i64,
}

impl NewOrderLine {
    pub fn new(price_offer_id: i64, quantity: i64) -> Self {
        Self { price_offer_id, quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: i64,
    /// The customer's request-for-quotes this order answers, if any
    #[serde(default)]
    pub order_request_id: Option<i64>,
    #[serde(default)]
    pub memo: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn new(customer_id: i64) -> Self {
        Self { customer_id, order_request_id: None, memo: None, lines: Vec::new() }
    }

    pub fn with_line(mut self, price_offer_id: i64, quantity: i64) -> Self {
        self.lines.push(NewOrderLine::new(price_offer_id, quantity));
        self
    }

    pub fn with_memo<S: Into<String>>(mut self, memo: S) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_order_request_id(mut self, order_request_id: i64) -> Self {
        self.order_request_id = Some(order_request_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub organization_id: i64,
    pub order_request_id: Option<i64>,
    pub memo: Option<String>,
    pub total_price: Money,
    pub status: OrderStatusType,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    /// `None` once the seller has withdrawn the offer. The line keeps its product and price.
    pub price_offer_id: Option<i64>,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price captured when the order was placed
    pub price: Money,
}

impl OrderLine {
    /// `None` if the total overflows.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

//--------------------------------------    MinPriceChange     ---------------------------------------------------------
/// Records that a product's catalog minimum price moved as a side effect of some stock or reservation change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinPriceChange {
    pub product_id: i64,
    pub old_price: Option<Money>,
    pub new_price: Option<Money>,
}

impl Display for MinPriceChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn price(p: Option<Money>) -> String {
            p.map(|p| p.to_string()).unwrap_or_else(|| "n/a".into())
        }
        write!(f, "product #{}: {} -> {}", self.product_id, price(self.old_price), price(self.new_price))
    }
}
