//! # Backend contracts
//!
//! The traits in this module define what a storage backend has to provide for the marketplace engine. The engine APIs
//! in [`crate::mkp_api`] are generic over them, so the HTTP layer can be tested against mocks and the SQLite backend
//! can be swapped for another database.
//!
//! * [`CatalogManagement`] covers organizations, their warehouses and the product catalog.
//! * [`StockManagement`] covers price offers (stock balances) and the catalog minimum price of each product.
//! * [`ReservationManagement`] covers time-boxed holds against offers and their expiry.
//! * [`OrderManagement`] covers placing orders and moving them through their life cycle.
//!
//! Every write that changes the availability of an offer also recomputes the minimum price of the affected product in
//! the same transaction.
mod catalog_management;
mod data_objects;
mod order_management;
mod reservation_management;
mod stock_management;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use data_objects::{
    ExpiryResult,
    OfferAvailability,
    OfferUpdateResult,
    OrderResult,
    ReleaseResult,
    ReservationResult,
};
pub use order_management::{OrderFlowError, OrderManagement};
pub use reservation_management::ReservationManagement;
pub use stock_management::{StockError, StockManagement};
