use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use mkp_engine::{
    db_types::{MinPriceChange, Money, Role, StockBalance, Warehouse},
    traits::{OfferAvailability, OfferUpdateResult},
    CatalogApi,
    StockApi,
    StockError,
};
use serde_json::{json, Value};

use super::{
    helpers::{
        customer_token,
        delete_request,
        get_request,
        issue_token,
        no_events,
        post_request,
        put_request,
        seller_token,
    },
    mocks::{MockCatalogManager, MockStockManager},
};
use crate::routes::{CreateWarehouseRoute, MyOffersRoute, MyWarehousesRoute, RemoveOfferRoute, UpsertOfferRoute};

#[actix_web::test]
async fn warehouses_are_created_for_the_callers_organization() {
    let _ = env_logger::try_init().ok();
    let body = json!({"name": "North depot", "organization_id": 99});
    let (status, body) = post_request(&seller_token(5, 10), "/warehouses", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let warehouse: Warehouse = serde_json::from_str(&body).unwrap();
    assert_eq!(warehouse.organization_id, 10);
    assert_eq!(warehouse.name, "North depot");
}

#[actix_web::test]
async fn sellers_without_an_organization_are_forbidden() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(5, None, vec![Role::Seller]);
    let (status, body) = get_request(&token, "/warehouses", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient Permissions. User 5 is not associated with an organization"}"#);
}

#[actix_web::test]
async fn list_my_warehouses() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&seller_token(5, 10), "/warehouses", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let warehouses: Vec<Warehouse> = serde_json::from_str(&body).unwrap();
    assert_eq!(warehouses.len(), 2);
    assert!(warehouses.iter().all(|w| w.organization_id == 10));
}

#[actix_web::test]
async fn customers_cannot_manage_offers() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(&customer_token(7), "/offers", configure).await.expect_err("Expected error");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn upsert_offer() {
    let _ = env_logger::try_init().ok();
    let body = json!({"warehouse_id": 100, "product_id": 1, "price": 1_100, "amount": 12});
    let (status, body) = put_request(&seller_token(5, 10), "/offers", &body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: OfferUpdateResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.offer.organization_id, 10);
    assert_eq!(result.offer.price, Money::from(1_100));
    assert_eq!(result.price_change.unwrap().new_price, Some(Money::from(1_100)));
}

#[actix_web::test]
async fn upsert_offer_into_someone_elses_warehouse() {
    let _ = env_logger::try_init().ok();
    let body = json!({"warehouse_id": 200, "product_id": 1, "price": 1_100, "amount": 12});
    let (status, body) = put_request(&seller_token(5, 10), "/offers", &body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient Permissions. Warehouse 200 does not belong to organization 10"}"#);
}

#[actix_web::test]
async fn upsert_offer_with_negative_amount() {
    let _ = env_logger::try_init().ok();
    let body = json!({"warehouse_id": 100, "product_id": 1, "price": 1_100, "amount": -1});
    let (status, _) = put_request(&seller_token(5, 10), "/offers", &body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn list_my_offers() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&seller_token(5, 10), "/offers", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let offers: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(offers[0]["id"], 1);
    assert_eq!(offers[0]["warehouse_name"], "North depot");
    assert_eq!(offers[0]["reserved"], 3);
    assert_eq!(offers[0]["available"], 7);
}

#[actix_web::test]
async fn remove_own_offer() {
    let _ = env_logger::try_init().ok();
    let (status, body) = delete_request(&seller_token(5, 10), "/offers/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: OfferUpdateResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.offer.id, 1);
}

#[actix_web::test]
async fn remove_offer_with_reservations() {
    let _ = env_logger::try_init().ok();
    let (status, body) = delete_request(&seller_token(5, 20), "/offers/2", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        r#"{"error":"The request conflicts with the current state. Price offer 2 still has active reservations"}"#
    );
}

#[actix_web::test]
async fn remove_another_organizations_offer() {
    let _ = env_logger::try_init().ok();
    let (status, _) = delete_request(&seller_token(5, 10), "/offers/2", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = delete_request(&seller_token(5, 10), "/offers/3", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut catalog = MockCatalogManager::new();
    catalog.expect_create_warehouse().returning(|w| Ok(warehouse(50, w.organization_id, &w.name)));
    catalog
        .expect_fetch_warehouses_for_organization()
        .returning(|org| Ok(vec![warehouse(100, org, "North depot"), warehouse(101, org, "South depot")]));
    let mut stock = MockStockManager::new();
    stock.expect_upsert_stock_balance().returning(|offer, _| {
        if offer.warehouse_id != 100 {
            return Err(StockError::WarehouseNotOwned {
                warehouse_id: offer.warehouse_id,
                organization_id: offer.organization_id,
            });
        }
        let mut balance = balance(1, offer.organization_id, offer.amount);
        balance.price = offer.price;
        let price_change = MinPriceChange { product_id: 1, old_price: None, new_price: Some(offer.price) };
        Ok(OfferUpdateResult { offer: balance, price_change: Some(price_change) })
    });
    stock.expect_offers_for_organization().returning(|org, _| {
        Ok(vec![OfferAvailability {
            offer: balance(1, org, 10),
            warehouse_name: "North depot".to_string(),
            reserved: 3,
            available: 7,
        }])
    });
    stock.expect_fetch_stock_balance().returning(|id| match id {
        1 => Ok(Some(balance(1, 10, 10))),
        2 => Ok(Some(balance(2, 20, 10))),
        _ => Ok(None),
    });
    stock.expect_remove_stock_balance().returning(|id, _| match id {
        2 => Err(StockError::OfferHasReservations(2)),
        id => Ok(OfferUpdateResult { offer: balance(id, 10, 10), price_change: None }),
    });
    cfg.service(CreateWarehouseRoute::<MockCatalogManager>::new())
        .service(MyWarehousesRoute::<MockCatalogManager>::new())
        .service(UpsertOfferRoute::<MockStockManager>::new())
        .service(MyOffersRoute::<MockStockManager>::new())
        .service(RemoveOfferRoute::<MockStockManager>::new())
        .app_data(web::Data::new(CatalogApi::new(catalog)))
        .app_data(web::Data::new(StockApi::new(stock, no_events())));
}

fn warehouse(id: i64, organization_id: i64, name: &str) -> Warehouse {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    Warehouse { id, organization_id, name: name.to_string(), address: None, created_at: now, updated_at: now }
}

fn balance(id: i64, organization_id: i64, amount: i64) -> StockBalance {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    StockBalance {
        id,
        organization_id,
        warehouse_id: 100,
        product_id: 1,
        price: Money::from(1_500),
        amount,
        created_at: now,
        updated_at: now,
    }
}
