use chrono::{DateTime, Duration, Utc};
use mkp_engine::{
    db_types::{
        MinPriceChange,
        NewOrder,
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
        StockBalance,
        Warehouse,
    },
    order_objects::OrderQueryFilter,
    price_objects::{Pagination, ProductQueryFilter},
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
use mockall::mock;

mock! {
    pub CatalogManager {}
    impl Clone for CatalogManager {
        fn clone(&self) -> Self;
    }
    impl CatalogManagement for CatalogManager {
        async fn create_organization(&self, name: &str) -> Result<Organization, CatalogError>;
        async fn fetch_organization(&self, id: i64) -> Result<Option<Organization>, CatalogError>;
        async fn create_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse, CatalogError>;
        async fn fetch_warehouse(&self, id: i64) -> Result<Option<Warehouse>, CatalogError>;
        async fn fetch_warehouses_for_organization(&self, organization_id: i64) -> Result<Vec<Warehouse>, CatalogError>;
        async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
        async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError>;
        async fn search_products(&self, filter: ProductQueryFilter, page: Pagination) -> Result<Vec<Product>, CatalogError>;
    }
}

mock! {
    pub StockManager {}
    impl Clone for StockManager {
        fn clone(&self) -> Self;
    }
    impl StockManagement for StockManager {
        async fn upsert_stock_balance(&self, offer: NewStockBalance, now: DateTime<Utc>) -> Result<OfferUpdateResult, StockError>;
        async fn fetch_stock_balance(&self, id: i64) -> Result<Option<StockBalance>, StockError>;
        async fn offers_for_organization(&self, organization_id: i64, now: DateTime<Utc>) -> Result<Vec<OfferAvailability>, StockError>;
        async fn offers_for_product(&self, product_id: i64, now: DateTime<Utc>) -> Result<Vec<OfferAvailability>, StockError>;
        async fn remove_stock_balance(&self, id: i64, now: DateTime<Utc>) -> Result<OfferUpdateResult, StockError>;
        async fn update_product_min_price(&self, product_id: i64, now: DateTime<Utc>) -> Result<Option<MinPriceChange>, StockError>;
    }
}

mock! {
    pub ReservationManager {}
    impl Clone for ReservationManager {
        fn clone(&self) -> Self;
    }
    impl ReservationManagement for ReservationManager {
        async fn reserve_priced_product(&self, reservation: NewReservation, ttl: Duration, now: DateTime<Utc>) -> Result<ReservationResult, StockError>;
        async fn release_reservation(&self, id: i64, now: DateTime<Utc>) -> Result<ReleaseResult, StockError>;
        async fn fetch_reservation(&self, id: i64) -> Result<Option<PricedProductReservation>, StockError>;
        async fn reservations_for_order(&self, order_id: i64) -> Result<Vec<PricedProductReservation>, StockError>;
        async fn expire_reservations(&self, now: DateTime<Utc>) -> Result<ExpiryResult, StockError>;
    }
}

mock! {
    pub OrderManager {}
    impl Clone for OrderManager {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for OrderManager {
        async fn place_order(&self, order: NewOrder, ttl: Duration, now: DateTime<Utc>) -> Result<OrderResult, OrderFlowError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
        async fn annul_order(&self, id: i64, status: OrderStatusType, now: DateTime<Utc>) -> Result<OrderResult, OrderFlowError>;
        async fn complete_order(&self, id: i64, now: DateTime<Utc>) -> Result<OrderResult, OrderFlowError>;
    }
}
