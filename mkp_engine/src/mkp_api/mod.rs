//! # Marketplace engine public API
//!
//! The `mkp_api` module exposes the programmatic API of the marketplace engine. Each API is created by supplying a
//! backend that implements the traits it needs, so clients can pick the parts they use.
//!
//! * [`catalog_api`] manages organizations, warehouses and the product catalog.
//! * [`stock_api`] manages price offers and exposes the per-product price view.
//! * [`reservation_api`] holds and releases stock, and runs the expiry sweep.
//! * [`order_flow_api`] places orders and moves them through their life cycle.
//!
//! ```rust,ignore
//! use mkp_engine::{events::EventProducers, ReservationApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = ReservationApi::new(db, EventProducers::default());
//! let result = api.reserve(NewReservation::new(ReservationKey::new(offer_id, product_id), 2)).await?;
//! ```
pub mod catalog_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod price_objects;
pub mod reservation_api;
pub mod stock_api;
