use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, TimeZone, Utc};
use mkp_engine::{
    db_types::{MinPriceChange, Money, OrderStatusType, PricedProductReservation, ReservationKey},
    traits::{ExpiryResult, ReleaseResult, ReservationResult},
    OrderFlowApi,
    ReservationApi,
    StockError,
};
use serde_json::{json, Value};

use super::{
    helpers::{customer_token, delete_request, manager_token, no_events, order, post_request, seller_token},
    mocks::{MockOrderManager, MockReservationManager},
};
use crate::routes::{ExpireReservationsRoute, ReleaseReservationRoute, ReserveRoute};

#[actix_web::test]
async fn reserve_stock() {
    let _ = env_logger::try_init().ok();
    let body = json!({"price_offer_id": 4, "product_id": 1, "order_id": 12, "count": 3});
    let (status, body) = post_request(&customer_token(7), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: ReservationResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.reservation.quantity, 3);
    assert_eq!(result.reservation.order_id, Some(12));
    assert_eq!(result.available, 7);
    assert_eq!(result.reservation.expires_at - result.reservation.created_at, Duration::days(3));
}

#[actix_web::test]
async fn sellers_can_reserve_stock() {
    let _ = env_logger::try_init().ok();
    let body = json!({"price_offer_id": 4, "product_id": 1, "count": 2});
    let (status, _) = post_request(&seller_token(5, 10), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn reserving_more_than_is_available_is_gone() {
    let _ = env_logger::try_init().ok();
    let body = json!({"price_offer_id": 4, "product_id": 1, "count": 11});
    let (status, body) = post_request(&customer_token(7), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body, r#"{"error":"Insufficient stock on offer 4: requested 11, available 10"}"#);
}

#[actix_web::test]
async fn reserving_zero_units_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({"price_offer_id": 4, "product_id": 1, "count": 0});
    let (status, _) = post_request(&customer_token(7), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn reserving_against_someone_elses_order_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let body = json!({"price_offer_id": 4, "product_id": 1, "order_id": 13, "count": 1});
    let (status, body) = post_request(&customer_token(7), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient Permissions. Order 13 does not belong to this user"}"#);
    let body = json!({"price_offer_id": 4, "product_id": 1, "order_id": 12, "count": 1});
    let (status, _) = post_request(&seller_token(5, 10), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn reserving_against_a_missing_order() {
    let _ = env_logger::try_init().ok();
    let body = json!({"price_offer_id": 4, "product_id": 1, "order_id": 99, "count": 1});
    let (status, body) = post_request(&manager_token(), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order 99"}"#);
}

#[actix_web::test]
async fn managers_reserve_against_any_order() {
    let _ = env_logger::try_init().ok();
    let body = json!({"price_offer_id": 4, "product_id": 1, "order_id": 13, "count": 2});
    let (status, body) = post_request(&manager_token(), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: ReservationResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.reservation.order_id, Some(13));
}

#[actix_web::test]
async fn reserving_against_a_completed_order_conflicts() {
    let _ = env_logger::try_init().ok();
    let body = json!({"price_offer_id": 4, "product_id": 1, "order_id": 14, "count": 1});
    let (status, body) = post_request(&customer_token(7), "/reservations", &body, configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        r#"{"error":"The request conflicts with the current state. Order 14 is Completed and cannot hold reservations"}"#
    );
}

#[actix_web::test]
async fn release_reservation() {
    let _ = env_logger::try_init().ok();
    let (status, body) = delete_request(&manager_token(), "/reservations/31", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["reservation"]["id"], 31);
    assert_eq!(result["price_change"]["new_price"], 1_500);
}

#[actix_web::test]
async fn release_missing_reservation() {
    let _ = env_logger::try_init().ok();
    let (status, body) = delete_request(&manager_token(), "/reservations/99", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Reservation 99 does not exist"}"#);
}

#[actix_web::test]
async fn customers_cannot_release_reservations() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        delete_request(&customer_token(7), "/reservations/31", configure).await.expect_err("Expected error");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn expire_reservations() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&manager_token(), "/expire_reservations", &json!({}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: ExpiryResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.expired_orders.len(), 1);
    assert_eq!(result.expired_orders[0].id, 12);
    assert_eq!(result.released.len(), 2);
    assert!(result.price_changes.is_empty());
}

#[actix_web::test]
async fn sellers_cannot_trigger_the_expiry_sweep() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request(&seller_token(5, 10), "/expire_reservations", &json!({}), configure)
        .await
        .expect_err("Expected error");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut reservations = MockReservationManager::new();
    reservations.expect_reserve_priced_product().returning(|req, ttl, _| {
        if req.count <= 0 {
            return Err(StockError::InvalidQuantity(req.count));
        }
        if let Some(order_id @ 14) = req.key.order_id {
            return Err(StockError::OrderClosed { order_id, status: OrderStatusType::Completed });
        }
        if req.count > 10 {
            let offer_id = req.key.price_offer_id;
            return Err(StockError::InsufficientStock { offer_id, requested: req.count, available: 10 });
        }
        let mut reservation = reservation(30, req.key, req.count);
        reservation.expires_at = reservation.created_at + ttl;
        Ok(ReservationResult { reservation, available: 10 - req.count, price_change: None })
    });
    reservations.expect_release_reservation().returning(|id, _| match id {
        31 => {
            let price_change = MinPriceChange { product_id: 1, old_price: None, new_price: Some(Money::from(1_500)) };
            let reservation = reservation(31, ReservationKey::new(4, 1), 2);
            Ok(ReleaseResult { reservation, price_change: Some(price_change) })
        },
        id => Err(StockError::ReservationNotFound(id)),
    });
    reservations.expect_expire_reservations().returning(|_| {
        Ok(ExpiryResult {
            expired_orders: vec![order(12, 7, 10, OrderStatusType::Expired)],
            released: vec![
                reservation(30, ReservationKey::new(4, 1).with_order_id(12), 3),
                reservation(32, ReservationKey::new(5, 1), 1),
            ],
            price_changes: vec![],
        })
    });
    let mut orders = MockOrderManager::new();
    orders.expect_fetch_order().returning(|id| {
        Ok(match id {
            12 => Some(order(12, 7, 10, OrderStatusType::New)),
            13 => Some(order(13, 8, 10, OrderStatusType::New)),
            14 => Some(order(14, 7, 10, OrderStatusType::Completed)),
            _ => None,
        })
    });
    cfg.service(ReserveRoute::<MockReservationManager, MockOrderManager>::new())
        .service(ReleaseReservationRoute::<MockReservationManager>::new())
        .service(ExpireReservationsRoute::<MockReservationManager>::new())
        .app_data(web::Data::new(ReservationApi::new(reservations, no_events())))
        .app_data(web::Data::new(OrderFlowApi::new(orders, no_events())));
}

fn reservation(id: i64, key: ReservationKey, quantity: i64) -> PricedProductReservation {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    PricedProductReservation {
        id,
        price_offer_id: key.price_offer_id,
        product_id: key.product_id,
        order_id: key.order_id,
        offer_id: key.offer_id,
        request_product_id: key.request_product_id,
        offer_product_id: key.offer_product_id,
        quantity,
        expires_at: now + Duration::days(3),
        created_at: now,
        updated_at: now,
    }
}
