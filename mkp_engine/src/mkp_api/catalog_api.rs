use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, NewWarehouse, Organization, Product, Warehouse},
    helpers::{is_valid_sku, normalize_sku},
    mkp_api::price_objects::{Pagination, ProductQueryFilter},
    traits::{CatalogError, CatalogManagement},
};

/// Organizations, their warehouses and the product catalog.
pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_organization(&self, name: &str) -> Result<Organization, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidName("Organization name cannot be blank".into()));
        }
        let org = self.db.create_organization(name).await?;
        info!("🏢️ Organization #{} ({}) registered", org.id, org.name);
        Ok(org)
    }

    pub async fn fetch_organization(&self, id: i64) -> Result<Option<Organization>, CatalogError> {
        self.db.fetch_organization(id).await
    }

    pub async fn create_warehouse(&self, mut warehouse: NewWarehouse) -> Result<Warehouse, CatalogError> {
        warehouse.name = warehouse.name.trim().to_string();
        if warehouse.name.is_empty() {
            return Err(CatalogError::InvalidName("Warehouse name cannot be blank".into()));
        }
        self.db.create_warehouse(warehouse).await
    }

    pub async fn fetch_warehouse(&self, id: i64) -> Result<Option<Warehouse>, CatalogError> {
        self.db.fetch_warehouse(id).await
    }

    pub async fn warehouses_for_organization(&self, organization_id: i64) -> Result<Vec<Warehouse>, CatalogError> {
        self.db.fetch_warehouses_for_organization(organization_id).await
    }

    /// Adds a product to the catalog. SKUs are stored upper-cased.
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let sku = normalize_sku(&product.sku);
        if !is_valid_sku(&sku) {
            return Err(CatalogError::InvalidSku(product.sku));
        }
        let name = product.name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidName("Product name cannot be blank".into()));
        }
        let product = self.db.create_product(NewProduct::new(sku, name)).await?;
        info!("🏢️ Product #{} [{}] added to the catalog", product.id, product.sku);
        Ok(product)
    }

    pub async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        self.db.fetch_product(id).await
    }

    pub async fn search_products(
        &self,
        mut filter: ProductQueryFilter,
        page: Pagination,
    ) -> Result<Vec<Product>, CatalogError> {
        let page = page.validated().map_err(CatalogError::InvalidQuery)?;
        filter.sku = filter.sku.map(|s| normalize_sku(&s));
        self.db.search_products(filter, page).await
    }
}
