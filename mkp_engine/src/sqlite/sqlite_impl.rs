//! `SqliteDatabase` is the concrete marketplace engine backend.
//!
//! It implements every trait in [`crate::traits`]. Each method obtains a connection (or opens a transaction) from the
//! pool and composes the free functions in [`super::db`].
use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, organizations, products, reservations, stock_balances};
use crate::{
    db_types::{
        MinPriceChange,
        Money,
        NewOrder,
        NewOrderLine,
        NewProduct,
        NewReservation,
        NewStockBalance,
        NewWarehouse,
        Order,
        OrderLine,
        OrderStatusType,
        Organization,
        PricedProductReservation,
        Product,
        ReservationKey,
        StockBalance,
        Warehouse,
    },
    helpers::expiry_from,
    mkp_api::{
        order_objects::OrderQueryFilter,
        price_objects::{Pagination, ProductQueryFilter},
    },
    sqlite::db::orders::OrderHeader,
    traits::{
        CatalogError,
        CatalogManagement,
        ExpiryResult,
        OfferAvailability,
        OfferUpdateResult,
        OrderFlowError,
        OrderManagement,
        OrderResult,
        ReleaseResult,
        ReservationManagement,
        ReservationResult,
        StockError,
        StockManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `MKP_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date with the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn create_organization(&self, name: &str) -> Result<Organization, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let org = organizations::insert_organization(name, &mut tx).await?;
        tx.commit().await?;
        Ok(org)
    }

    async fn fetch_organization(&self, id: i64) -> Result<Option<Organization>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let org = organizations::fetch_organization(id, &mut conn).await?;
        Ok(org)
    }

    async fn create_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let org_id = warehouse.organization_id;
        if organizations::fetch_organization(org_id, &mut tx).await?.is_none() {
            return Err(CatalogError::OrganizationNotFound(org_id));
        }
        let warehouse = organizations::insert_warehouse(warehouse, &mut tx).await?;
        tx.commit().await?;
        Ok(warehouse)
    }

    async fn fetch_warehouse(&self, id: i64) -> Result<Option<Warehouse>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let warehouse = organizations::fetch_warehouse(id, &mut conn).await?;
        Ok(warehouse)
    }

    async fn fetch_warehouses_for_organization(&self, organization_id: i64) -> Result<Vec<Warehouse>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let warehouses = organizations::warehouses_for_organization(organization_id, &mut conn).await?;
        Ok(warehouses)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn search_products(
        &self,
        filter: ProductQueryFilter,
        page: Pagination,
    ) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::search_products(filter, page, &mut conn).await?;
        Ok(products)
    }
}

impl StockManagement for SqliteDatabase {
    async fn upsert_stock_balance(
        &self,
        offer: NewStockBalance,
        now: DateTime<Utc>,
    ) -> Result<OfferUpdateResult, StockError> {
        if offer.price.is_negative() {
            return Err(StockError::InvalidPrice(offer.price));
        }
        if offer.amount < 0 {
            return Err(StockError::InvalidAmount(offer.amount));
        }
        let mut tx = self.pool.begin().await?;
        if !products::lock_product(offer.product_id, &mut tx).await? {
            return Err(StockError::ProductNotFound(offer.product_id));
        }
        let warehouse = organizations::fetch_warehouse(offer.warehouse_id, &mut tx)
            .await?
            .ok_or(StockError::WarehouseNotFound(offer.warehouse_id))?;
        if warehouse.organization_id != offer.organization_id {
            return Err(StockError::WarehouseNotOwned {
                warehouse_id: warehouse.id,
                organization_id: offer.organization_id,
            });
        }
        let offer = stock_balances::upsert_offer(offer, &mut tx).await?;
        let price_change = products::recompute_min_price(offer.product_id, now, &mut tx).await?;
        tx.commit().await?;
        Ok(OfferUpdateResult { offer, price_change })
    }

    async fn fetch_stock_balance(&self, id: i64) -> Result<Option<StockBalance>, StockError> {
        let mut conn = self.pool.acquire().await?;
        let offer = stock_balances::fetch_offer(id, &mut conn).await?;
        Ok(offer)
    }

    async fn offers_for_organization(
        &self,
        organization_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<OfferAvailability>, StockError> {
        let mut conn = self.pool.acquire().await?;
        let offers = stock_balances::offers_for_organization(organization_id, now, &mut conn).await?;
        Ok(offers)
    }

    async fn offers_for_product(
        &self,
        product_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<OfferAvailability>, StockError> {
        let mut tx = self.pool.begin().await?;
        if products::fetch_product(product_id, &mut tx).await?.is_none() {
            return Err(StockError::ProductNotFound(product_id));
        }
        let offers = stock_balances::offers_for_product(product_id, now, &mut tx).await?;
        tx.commit().await?;
        Ok(offers)
    }

    async fn remove_stock_balance(&self, id: i64, now: DateTime<Utc>) -> Result<OfferUpdateResult, StockError> {
        let mut tx = self.pool.begin().await?;
        if !stock_balances::lock_offer(id, &mut tx).await? {
            return Err(StockError::OfferNotFound(id));
        }
        if reservations::active_count_for_offer(id, now, &mut tx).await? > 0 {
            return Err(StockError::OfferHasReservations(id));
        }
        let offer = stock_balances::delete_offer(id, &mut tx).await?.ok_or(StockError::OfferNotFound(id))?;
        let price_change = products::recompute_min_price(offer.product_id, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Offer #{id} has been withdrawn");
        Ok(OfferUpdateResult { offer, price_change })
    }

    async fn update_product_min_price(
        &self,
        product_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<MinPriceChange>, StockError> {
        let mut tx = self.pool.begin().await?;
        if !products::lock_product(product_id, &mut tx).await? {
            return Err(StockError::ProductNotFound(product_id));
        }
        let change = products::recompute_min_price(product_id, now, &mut tx).await?;
        tx.commit().await?;
        Ok(change)
    }
}

impl ReservationManagement for SqliteDatabase {
    async fn reserve_priced_product(
        &self,
        reservation: NewReservation,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<ReservationResult, StockError> {
        if reservation.count <= 0 {
            return Err(StockError::InvalidQuantity(reservation.count));
        }
        let mut tx = self.pool.begin().await?;
        if let Some(order_id) = reservation.key.order_id {
            if !orders::lock_order(order_id, &mut tx).await? {
                return Err(StockError::OrderNotFound(order_id));
            }
            let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(StockError::OrderNotFound(order_id))?;
            if order.status != OrderStatusType::New {
                return Err(StockError::OrderClosed { order_id, status: order.status });
            }
        }
        let expires_at = expiry_from(now, ttl);
        let reserved = reservations::reserve(&reservation, expires_at, now, &mut tx).await?;
        let price_change = products::recompute_min_price(reserved.offer.product_id, now, &mut tx).await?;
        tx.commit().await?;
        Ok(ReservationResult { reservation: reserved.reservation, available: reserved.available, price_change })
    }

    async fn release_reservation(&self, id: i64, now: DateTime<Utc>) -> Result<ReleaseResult, StockError> {
        let mut tx = self.pool.begin().await?;
        let reservation =
            reservations::delete_reservation(id, &mut tx).await?.ok_or(StockError::ReservationNotFound(id))?;
        let price_change = products::recompute_min_price(reservation.product_id, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Reservation #{id} released");
        Ok(ReleaseResult { reservation, price_change })
    }

    async fn fetch_reservation(&self, id: i64) -> Result<Option<PricedProductReservation>, StockError> {
        let mut conn = self.pool.acquire().await?;
        let reservation = reservations::fetch_reservation(id, &mut conn).await?;
        Ok(reservation)
    }

    async fn reservations_for_order(&self, order_id: i64) -> Result<Vec<PricedProductReservation>, StockError> {
        let mut conn = self.pool.acquire().await?;
        let result = reservations::reservations_for_order(order_id, &mut conn).await?;
        Ok(result)
    }

    async fn expire_reservations(&self, now: DateTime<Utc>) -> Result<ExpiryResult, StockError> {
        let mut tx = self.pool.begin().await?;
        let expired_orders = orders::expire_new_orders(now, &mut tx).await?;
        let mut released = reservations::delete_expired(now, &mut tx).await?;
        for order in &expired_orders {
            let held = reservations::delete_for_order(order.id, &mut tx).await?;
            released.extend(held);
        }
        let product_ids = released.iter().map(|r| r.product_id).collect::<Vec<_>>();
        let price_changes = products::recompute_min_prices(&product_ids, now, &mut tx).await?;
        tx.commit().await?;
        if !expired_orders.is_empty() || !released.is_empty() {
            info!(
                "🗃️ Expiry sweep: {} orders expired, {} reservations released, {} prices changed",
                expired_orders.len(),
                released.len(),
                price_changes.len()
            );
        }
        Ok(ExpiryResult { expired_orders, released, price_changes })
    }
}

/// Folds repeated offers into a single line, keeping the order in which they first appear.
fn merge_lines(lines: Vec<NewOrderLine>) -> Result<Vec<NewOrderLine>, StockError> {
    let mut merged: Vec<NewOrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(StockError::InvalidQuantity(line.quantity));
        }
        match merged.iter_mut().find(|l| l.price_offer_id == line.price_offer_id) {
            Some(existing) => {
                existing.quantity =
                    existing.quantity.checked_add(line.quantity).ok_or(StockError::InvalidQuantity(line.quantity))?
            },
            None => merged.push(line),
        }
    }
    Ok(merged)
}

impl OrderManagement for SqliteDatabase {
    async fn place_order(
        &self,
        order: NewOrder,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<OrderResult, OrderFlowError> {
        if order.lines.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        let lines = merge_lines(order.lines)?;
        let mut tx = self.pool.begin().await?;
        let mut offers = Vec::with_capacity(lines.len());
        for line in &lines {
            if !stock_balances::lock_offer(line.price_offer_id, &mut tx).await? {
                return Err(StockError::OfferNotFound(line.price_offer_id).into());
            }
            let offer = stock_balances::fetch_offer(line.price_offer_id, &mut tx)
                .await?
                .ok_or(StockError::OfferNotFound(line.price_offer_id))?;
            offers.push(offer);
        }
        let organization_id = offers[0].organization_id;
        if offers.iter().any(|o| o.organization_id != organization_id) {
            return Err(OrderFlowError::MixedSellers);
        }
        let total = lines
            .iter()
            .zip(offers.iter())
            .try_fold(Money::default(), |total, (line, offer)| {
                offer.price.checked_mul(line.quantity).and_then(|line_total| total.checked_add(line_total))
            })
            .ok_or(OrderFlowError::TotalOverflow)?;
        let expires_at = expiry_from(now, ttl);
        let header = OrderHeader {
            customer_id: order.customer_id,
            organization_id,
            order_request_id: order.order_request_id,
            memo: order.memo,
            expires_at,
        };
        let new_order = orders::insert_order(header, &mut tx).await?;
        let mut order_lines = Vec::with_capacity(lines.len());
        for (line, offer) in lines.iter().zip(offers.iter()) {
            let key = ReservationKey::new(offer.id, offer.product_id).with_order_id(new_order.id);
            let reservation = NewReservation::new(key, line.quantity);
            reservations::reserve(&reservation, expires_at, now, &mut tx).await?;
            let order_line =
                orders::insert_line(new_order.id, offer.id, offer.product_id, line.quantity, offer.price, &mut tx)
                    .await?;
            order_lines.push(order_line);
        }
        let new_order = orders::set_total_price(new_order.id, total, &mut tx).await?;
        let product_ids = offers.iter().map(|o| o.product_id).collect::<Vec<_>>();
        let price_changes = products::recompute_min_prices(&product_ids, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} placed with {} lines for {total}", new_order.id, order_lines.len());
        Ok(OrderResult::new(new_order, order_lines, price_changes))
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let lines = orders::fetch_lines(order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn annul_order(
        &self,
        id: i64,
        status: OrderStatusType,
        now: DateTime<Utc>,
    ) -> Result<OrderResult, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(id, &mut tx).await? {
            return Err(OrderFlowError::OrderNotFound(id));
        }
        let order = orders::fetch_order(id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(id))?;
        let annulment = matches!(status, OrderStatusType::Cancelled | OrderStatusType::Expired);
        if order.status != OrderStatusType::New || !annulment {
            return Err(OrderFlowError::OrderModificationForbidden { id, from: order.status, to: status });
        }
        let released = reservations::delete_for_order(id, &mut tx).await?;
        let order = orders::update_order_status(id, status, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(id))?;
        let lines = orders::fetch_lines(id, &mut tx).await?;
        let product_ids =
            released.iter().map(|r| r.product_id).chain(lines.iter().map(|l| l.product_id)).collect::<Vec<_>>();
        let price_changes = products::recompute_min_prices(&product_ids, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{id} is now {status}. {} reservations released", released.len());
        Ok(OrderResult::new(order, lines, price_changes))
    }

    async fn complete_order(&self, id: i64, now: DateTime<Utc>) -> Result<OrderResult, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(id, &mut tx).await? {
            return Err(OrderFlowError::OrderNotFound(id));
        }
        let order = orders::fetch_order(id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(id))?;
        if order.status != OrderStatusType::New {
            return Err(OrderFlowError::OrderModificationForbidden {
                id,
                from: order.status,
                to: OrderStatusType::Completed,
            });
        }
        if order.expires_at <= now {
            return Err(OrderFlowError::OrderExpired(id));
        }
        let lines = orders::fetch_lines(id, &mut tx).await?;
        reservations::delete_for_order(id, &mut tx).await?;
        for line in &lines {
            let offer_id =
                line.price_offer_id.ok_or(OrderFlowError::OfferWithdrawn { order_id: id, line_id: line.id })?;
            if !stock_balances::lock_offer(offer_id, &mut tx).await? {
                return Err(OrderFlowError::OfferWithdrawn { order_id: id, line_id: line.id });
            }
            let offer = stock_balances::fetch_offer(offer_id, &mut tx)
                .await?
                .ok_or(OrderFlowError::OfferWithdrawn { order_id: id, line_id: line.id })?;
            // Other customers' holds do not block the write-off. Only the physical amount can run short.
            if offer.amount < line.quantity {
                let (requested, available) = (line.quantity, offer.amount);
                return Err(StockError::InsufficientStock { offer_id, requested, available }.into());
            }
            stock_balances::decrement_amount(offer_id, line.quantity, &mut tx).await?;
        }
        let order = orders::update_order_status(id, OrderStatusType::Completed, &mut tx)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(id))?;
        let product_ids = lines.iter().map(|l| l.product_id).collect::<Vec<_>>();
        let price_changes = products::recompute_min_prices(&product_ids, now, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order #{id} completed. {} lines written off stock", lines.len());
        Ok(OrderResult::new(order, lines, price_changes))
    }
}
