use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use mkp_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CatalogApi,
    OrderFlowApi,
    ReservationApi,
    SqliteDatabase,
    StockApi,
};

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    middleware::JwtMiddlewareFactory,
    routes::{
        health,
        CancelOrderRoute,
        CompleteOrderRoute,
        CreateOrganizationRoute,
        CreateProductRoute,
        CreateWarehouseRoute,
        ExpireReservationsRoute,
        MyOffersRoute,
        MyOrdersRoute,
        MyWarehousesRoute,
        OrderByIdRoute,
        PlaceOrderRoute,
        ProductByIdRoute,
        ProductPricesRoute,
        ReleaseReservationRoute,
        RemoveOfferRoute,
        ReserveRoute,
        SearchProductsRoute,
        UpdateMinPriceRoute,
        UpsertOfferRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
        info!("🗃️ Database migrations complete");
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let sweeper = ReservationApi::new(db.clone(), producers.clone()).with_ttl(config.reservation_ttl);
    let _worker = start_expiry_worker(sweeper, config.expiry_sweep_interval);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The server's own subscribers. They only log; anything that needs to react to marketplace events (search indexes,
/// notifications) hooks in here.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_annulled(|ev| {
            Box::pin(async move {
                info!("📬️ Order #{} was {}", ev.order.id, ev.status);
            })
        })
        .on_order_completed(|ev| {
            Box::pin(async move {
                info!("📬️ Order #{} was completed. Total: {}", ev.order.id, ev.order.total_price);
            })
        })
        .on_min_price_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Minimum price changed for {}", ev.change);
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let verifier = TokenVerifier::new(&config.auth);
    let ttl = config.reservation_ttl;
    let srv = HttpServer::new(move || {
        let catalog_api = CatalogApi::new(db.clone());
        let stock_api = StockApi::new(db.clone(), producers.clone());
        let reservation_api = ReservationApi::new(db.clone(), producers.clone()).with_ttl(ttl);
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone()).with_ttl(ttl);
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(verifier.clone()))
            .service(CreateOrganizationRoute::<SqliteDatabase>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(UpdateMinPriceRoute::<SqliteDatabase>::new())
            .service(CreateWarehouseRoute::<SqliteDatabase>::new())
            .service(MyWarehousesRoute::<SqliteDatabase>::new())
            .service(UpsertOfferRoute::<SqliteDatabase>::new())
            .service(MyOffersRoute::<SqliteDatabase>::new())
            .service(RemoveOfferRoute::<SqliteDatabase>::new())
            .service(ReserveRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(ReleaseReservationRoute::<SqliteDatabase>::new())
            .service(ExpireReservationsRoute::<SqliteDatabase>::new())
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(CompleteOrderRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkp::access_log"))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(stock_api))
            .app_data(web::Data::new(reservation_api))
            .app_data(web::Data::new(orders_api))
            .service(health)
            .service(SearchProductsRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(ProductPricesRoute::<SqliteDatabase>::new())
            .service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
