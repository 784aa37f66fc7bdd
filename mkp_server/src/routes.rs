//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate function. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the engine APIs, which in turn await the
//! database pool, so nothing blocks.
//!
//! ## Access control
//! Role checks happen in the [`AclMiddlewareFactory`](crate::middleware::AclMiddlewareFactory) that the `route!`
//! macro wraps around each protected resource. Ownership checks (is this the caller's order, offer or organization?)
//! are done in the handlers, since they need the record in question.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use mkp_engine::{
    db_types::{NewProduct, NewReservation, Order, Role},
    order_objects::OrderQueryFilter,
    CatalogApi,
    CatalogManagement,
    OrderFlowApi,
    OrderManagement,
    ReservationApi,
    ReservationManagement,
    StockApi,
    StockManagement,
};
use serde_json::json;

use crate::{
    auth::JwtClaims,
    data_objects::{
        NewOrganizationRequest,
        NewWarehouseRequest,
        OfferRequest,
        OrderSearchParams,
        PlaceOrderRequest,
        PriceParams,
        ProductSearchParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalog (public)  --------------------------------------------------
route!(search_products => Get "/catalog/products" impl CatalogManagement);
/// Catalog search. Supports `name` (substring), `sku`, `in_stock`, `offset` and `count` query parameters.
pub async fn search_products<B: CatalogManagement>(
    query: web::Query<ProductSearchParams>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (filter, page) = query.into_inner().into_query();
    debug!("💻️ GET products search: {filter:?} {page:?}");
    let products = api.search_products(filter, page).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/catalog/products/{id}" impl CatalogManagement);
pub async fn product_by_id<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET product #{id}");
    let product = api.fetch_product(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Product {id}")))?;
    Ok(HttpResponse::Ok().json(product))
}

route!(product_prices => Get "/catalog/products/{id}/prices" impl StockManagement);
/// The price view of a product: its offers grouped by warehouse, cheapest group first, one page of groups at a time.
///
/// Query parameters: `in_stock_only` (hide offers with nothing available), `offset` and `count` (paging over the
/// warehouse groups).
pub async fn product_prices<B: StockManagement>(
    path: web::Path<i64>,
    query: web::Query<PriceParams>,
    api: web::Data<StockApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET prices for product #{id}");
    let prices = api.product_prices(id, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(prices))
}

//----------------------------------------------   Catalog management  ------------------------------------------------
route!(create_organization => Post "/organizations" impl CatalogManagement where requires [Role::Manager]);
pub async fn create_organization<B: CatalogManagement>(
    body: web::Json<NewOrganizationRequest>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new organization {}", body.name);
    let org = api.create_organization(&body.name).await?;
    Ok(HttpResponse::Created().json(org))
}

route!(create_product => Post "/products" impl CatalogManagement where requires [Role::Manager]);
pub async fn create_product<B: CatalogManagement>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new product {}", body.sku);
    let product = api.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_min_price => Post "/products/{id}/min_price" impl StockManagement where requires [Role::Manager]);
/// Recomputes the catalog minimum price of a product from its current offers and reservations.
pub async fn update_min_price<B: StockManagement>(
    path: web::Path<i64>,
    api: web::Data<StockApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ POST update min price for product #{id}");
    let change = api.update_product_min_price(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "product_id": id, "changed": change.is_some(), "change": change })))
}

//----------------------------------------------   Warehouses  ----------------------------------------------------
route!(create_warehouse => Post "/warehouses" impl CatalogManagement where requires [Role::Seller]);
pub async fn create_warehouse<B: CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<NewWarehouseRequest>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let org = claims.organization()?;
    debug!("💻️ POST new warehouse for organization #{org}");
    let warehouse = api.create_warehouse(body.into_inner().into_warehouse(org)).await?;
    Ok(HttpResponse::Created().json(warehouse))
}

route!(my_warehouses => Get "/warehouses" impl CatalogManagement where requires [Role::Seller]);
pub async fn my_warehouses<B: CatalogManagement>(
    claims: JwtClaims,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let org = claims.organization()?;
    debug!("💻️ GET warehouses for organization #{org}");
    let warehouses = api.warehouses_for_organization(org).await?;
    Ok(HttpResponse::Ok().json(warehouses))
}

//----------------------------------------------   Offers  ----------------------------------------------------
route!(upsert_offer => Put "/offers" impl StockManagement where requires [Role::Seller]);
/// Creates the caller's offer of a product at one of their warehouses, or replaces its price and amount if the
/// organization already offers that product there.
pub async fn upsert_offer<B: StockManagement>(
    claims: JwtClaims,
    body: web::Json<OfferRequest>,
    api: web::Data<StockApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let org = claims.organization()?;
    let offer = body.into_inner().into_offer(org);
    debug!(
        "💻️ PUT offer of product #{} at warehouse #{} for organization #{org}",
        offer.product_id, offer.warehouse_id
    );
    let result = api.upsert_offer(offer).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(my_offers => Get "/offers" impl StockManagement where requires [Role::Seller]);
pub async fn my_offers<B: StockManagement>(
    claims: JwtClaims,
    api: web::Data<StockApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let org = claims.organization()?;
    debug!("💻️ GET offers for organization #{org}");
    let offers = api.offers_for_organization(org).await?;
    Ok(HttpResponse::Ok().json(offers))
}

route!(remove_offer => Delete "/offers/{id}" impl StockManagement where requires [Role::Seller]);
pub async fn remove_offer<B: StockManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<StockApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let org = claims.organization()?;
    debug!("💻️ DELETE offer #{id} for organization #{org}");
    let offer = api.fetch_offer(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Price offer {id}")))?;
    if offer.organization_id != org {
        return Err(ServerError::InsufficientPermissions(format!("Price offer {id} belongs to another organization")));
    }
    let result = api.remove_offer(id).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Reservations  ----------------------------------------------------
route!(reserve => Post "/reservations" impl ReservationManagement, OrderManagement where requires [Role::Customer, Role::Seller, Role::Manager]);
/// Holds `count` units of a price offer under the given key for the configured reservation period. Reserving again
/// under the same key replaces the quantity and restarts the clock.
///
/// A key that names an order may only be used by the customer who placed it, or by a manager. The order must still
/// be `New`.
///
/// Responds with `410 Gone` when the offer does not have enough unreserved stock left.
pub async fn reserve<B: ReservationManagement, O: OrderManagement>(
    claims: JwtClaims,
    body: web::Json<NewReservation>,
    api: web::Data<ReservationApi<B>>,
    orders: web::Data<OrderFlowApi<O>>,
) -> Result<HttpResponse, ServerError> {
    let reservation = body.into_inner();
    debug!("💻️ POST reservation of {} by user #{} ({})", reservation.count, claims.sub, reservation.key);
    if let Some(order_id) = reservation.key.order_id {
        let order = fetch_order(&orders, order_id).await?;
        if !claims.is_manager() && !is_customer_of(&claims, &order) {
            return Err(ServerError::InsufficientPermissions(format!("Order {order_id} does not belong to this user")));
        }
    }
    let result = api.reserve(reservation).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(release_reservation => Delete "/reservations/{id}" impl ReservationManagement where requires [Role::Manager]);
pub async fn release_reservation<B: ReservationManagement>(
    path: web::Path<i64>,
    api: web::Data<ReservationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE reservation #{id}");
    let result = api.release(id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(expire_reservations => Post "/expire_reservations" impl ReservationManagement where requires [Role::Manager]);
/// Runs the expiry sweep immediately, rather than waiting for the background worker.
pub async fn expire_reservations<B: ReservationManagement>(
    api: web::Data<ReservationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ POST expire reservations");
    let result = api.expire_reservations().await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl OrderManagement where requires [Role::Customer]);
/// Places an order for the authenticated customer. Every line reserves stock on its offer; if any line cannot be
/// reserved, nothing is and the request fails (`410 Gone` for insufficient stock).
pub async fn place_order<B: OrderManagement>(
    claims: JwtClaims,
    body: web::Json<PlaceOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner().into_order(claims.sub);
    debug!("💻️ POST new order with {} lines for customer #{}", order.lines.len(), claims.sub);
    let result = api.place_order(order).await?;
    Ok(HttpResponse::Created().json(result))
}

route!(my_orders => Get "/orders" impl OrderManagement);
/// Order search. Managers see everything the query matches. Sellers are restricted to their organization's orders and
/// customers to their own, whatever the query says.
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = scope_order_query(&claims, OrderQueryFilter::try_from(query.into_inner())?)?;
    debug!("💻️ GET orders for user #{}: {query}", claims.sub);
    let orders = api.search_orders(query).await?;
    Ok(HttpResponse::Ok().json(orders))
}

fn scope_order_query(claims: &JwtClaims, query: OrderQueryFilter) -> Result<OrderQueryFilter, ServerError> {
    if claims.is_manager() {
        Ok(query)
    } else if claims.has_role(Role::Seller) {
        let org = claims.organization()?;
        Ok(OrderQueryFilter { organization_id: Some(org), ..query })
    } else if claims.has_role(Role::Customer) {
        Ok(OrderQueryFilter { customer_id: Some(claims.sub), ..query })
    } else {
        Err(ServerError::InsufficientPermissions("No role permits listing orders".into()))
    }
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET order #{id} for user #{}", claims.sub);
    let order = api.fetch_full_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    if !can_view_order(&claims, &order.order) {
        return Err(ServerError::InsufficientPermissions(format!("Order {id} is not visible to this user")));
    }
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl OrderManagement where requires [Role::Customer, Role::Manager]);
/// Cancels a new order and releases its reservations. Customers may only cancel their own orders.
pub async fn cancel_order<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ POST cancel order #{id} by user #{}", claims.sub);
    let order = fetch_order(api.as_ref(), id).await?;
    if !(claims.is_manager() || is_customer_of(&claims, &order)) {
        return Err(ServerError::InsufficientPermissions(format!("Order {id} does not belong to this user")));
    }
    let result = api.cancel_order(id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(complete_order => Post "/orders/{id}/complete" impl OrderManagement where requires [Role::Seller, Role::Manager]);
/// Marks a new order as fulfilled and writes its quantities off the offers. Sellers may only complete their own
/// organization's orders.
pub async fn complete_order<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ POST complete order #{id} by user #{}", claims.sub);
    let order = fetch_order(api.as_ref(), id).await?;
    if !(claims.is_manager() || is_seller_of(&claims, &order)) {
        return Err(ServerError::InsufficientPermissions(format!("Order {id} belongs to another organization")));
    }
    let result = api.complete_order(id).await?;
    Ok(HttpResponse::Ok().json(result))
}

async fn fetch_order<B: OrderManagement>(api: &OrderFlowApi<B>, id: i64) -> Result<Order, ServerError> {
    api.fetch_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))
}

fn is_customer_of(claims: &JwtClaims, order: &Order) -> bool {
    claims.has_role(Role::Customer) && order.customer_id == claims.sub
}

fn is_seller_of(claims: &JwtClaims, order: &Order) -> bool {
    claims.has_role(Role::Seller) && claims.org == Some(order.organization_id)
}

fn can_view_order(claims: &JwtClaims, order: &Order) -> bool {
    claims.is_manager() || is_customer_of(claims, order) || is_seller_of(claims, order)
}
