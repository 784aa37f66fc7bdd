use thiserror::Error;

use crate::{
    db_types::{NewProduct, NewWarehouse, Organization, Product, Warehouse},
    mkp_api::price_objects::{Pagination, ProductQueryFilter},
};

/// Organizations, warehouses and the product catalog.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    async fn create_organization(&self, name: &str) -> Result<Organization, CatalogError>;

    async fn fetch_organization(&self, id: i64) -> Result<Option<Organization>, CatalogError>;

    /// Creates a warehouse for an existing organization.
    async fn create_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse, CatalogError>;

    async fn fetch_warehouse(&self, id: i64) -> Result<Option<Warehouse>, CatalogError>;

    async fn fetch_warehouses_for_organization(&self, organization_id: i64) -> Result<Vec<Warehouse>, CatalogError>;

    /// Adds a product to the catalog. The SKU must be unique. New products have no minimum price.
    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError>;

    /// Products matching the filter, ordered by id.
    async fn search_products(
        &self,
        filter: ProductQueryFilter,
        page: Pagination,
    ) -> Result<Vec<Product>, CatalogError>;
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("'{0}' is not a valid SKU")]
    InvalidSku(String),
    #[error("A product with SKU {0} already exists")]
    DuplicateSku(String),
    #[error("Organization {0} does not exist")]
    OrganizationNotFound(i64),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}
