//! # Marketplace server
//! This crate hosts the HTTP front end of the marketplace engine. It is responsible for:
//! * Authenticating callers with the JWT bearer tokens issued to customers, sellers and managers.
//! * Checking the caller's roles and ownership before forwarding a request to the engine APIs.
//! * Mapping engine errors onto HTTP status codes (insufficient stock is reported as `410 Gone`).
//! * Running the background sweep that releases lapsed reservations and expires stale orders.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Public routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/catalog/products`, `/catalog/products/{id}` and `/catalog/products/{id}/prices`: catalog search, product
//!   details and the per-warehouse price view of a product.
//!
//! Everything else lives in the `/api` scope and requires a valid access token. See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
