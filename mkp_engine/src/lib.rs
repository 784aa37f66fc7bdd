//! Marketplace engine
//!
//! The core of the marketplace backend: sellers publish priced, quantified offers for catalog products at their
//! warehouses, customers hold quantity against those offers through time-boxed reservations (usually as part of an
//! order), and the catalog shows each product's minimum price among offers that still have stock available.
//!
//! The library is divided into two main sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite backend that implements them. The row types returned by the
//!    backends live in [`mod@db_types`].
//! 2. The public API ([`mod@mkp_api`]). Each API is generic over the backend traits it needs, and publishes
//!    [`mod@events`] after every committed change that subscribers may care about.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod mkp_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use mkp_api::{
    catalog_api::CatalogApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    price_objects,
    reservation_api::ReservationApi,
    stock_api::StockApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CatalogError,
    CatalogManagement,
    OrderFlowError,
    OrderManagement,
    ReservationManagement,
    StockError,
    StockManagement,
};
