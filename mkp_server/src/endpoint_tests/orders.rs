use actix_web::{http::StatusCode, web, web::ServiceConfig};
use mkp_engine::{
    db_types::{Money, Order, OrderLine, OrderStatusType},
    traits::{OrderFlowError, OrderResult},
    OrderFlowApi,
    StockError,
};
use serde_json::{json, Value};

use super::{
    helpers::{customer_token, get_request, manager_token, no_events, order, post_request, seller_token},
    mocks::MockOrderManager,
};
use crate::routes::{CancelOrderRoute, CompleteOrderRoute, MyOrdersRoute, OrderByIdRoute, PlaceOrderRoute};

#[actix_web::test]
async fn place_order_for_the_caller() {
    let _ = env_logger::try_init().ok();
    // The customer id in the body is ignored; orders always belong to the token's subject
    let body = json!({"customer_id": 99, "memo": "Leave at the gate", "lines": [{"price_offer_id": 4, "quantity": 2}]});
    let (status, body) = post_request(&customer_token(7), "/orders", &body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let result: OrderResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.order.customer_id, 7);
    assert_eq!(result.order.memo.as_deref(), Some("Leave at the gate"));
    assert_eq!(result.lines.len(), 1);
    assert_eq!(result.lines[0].price, Money::from(1_250));
}

#[actix_web::test]
async fn place_order_with_insufficient_stock() {
    let _ = env_logger::try_init().ok();
    let body = json!({"lines": [{"price_offer_id": 4, "quantity": 2}, {"price_offer_id": 5, "quantity": 50}]});
    let (status, body) = post_request(&customer_token(7), "/orders", &body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body, r#"{"error":"Insufficient stock on offer 5: requested 50, available 10"}"#);
}

#[actix_web::test]
async fn place_empty_order() {
    let _ = env_logger::try_init().ok();
    let body = json!({"lines": []});
    let (status, body) = post_request(&customer_token(7), "/orders", &body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid request. An order must have at least one line"}"#);
}

#[actix_web::test]
async fn only_customers_place_orders() {
    let _ = env_logger::try_init().ok();
    let body = json!({"lines": [{"price_offer_id": 4, "quantity": 2}]});
    let (status, _) =
        post_request(&seller_token(5, 10), "/orders", &body, configure).await.expect_err("Expected error");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn customers_only_see_their_own_orders() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(7), "/orders?customer_id=8", configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].customer_id, 7);
}

#[actix_web::test]
async fn sellers_only_see_their_organizations_orders() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&seller_token(5, 10), "/orders?organization_id=20", configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders[0].organization_id, 10);
}

#[actix_web::test]
async fn managers_search_all_orders() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&manager_token(), "/orders?customer_id=8&status=New,Expired", configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o.customer_id == 8));
    assert_eq!(orders[0].status, OrderStatusType::New);
    assert_eq!(orders[1].status, OrderStatusType::Expired);
}

#[actix_web::test]
async fn order_search_with_invalid_status() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(&manager_token(), "/orders?status=Shipped", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fetch_own_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(7), "/orders/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["id"], 1);
    assert_eq!(order["customer_id"], 7);
    assert_eq!(order["lines"].as_array().unwrap().len(), 2);
    assert_eq!(order["lines"][1]["price_offer_id"], Value::Null);
}

#[actix_web::test]
async fn fetch_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(&customer_token(8), "/orders/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get_request(&seller_token(5, 20), "/orders/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn sellers_see_their_organizations_order() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(&seller_token(5, 10), "/orders/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get_request(&manager_token(), "/orders/2", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&manager_token(), "/orders/9", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order 9"}"#);
}

#[actix_web::test]
async fn cancel_own_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&customer_token(7), "/orders/1/cancel", &json!({}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: OrderResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.order.status, OrderStatusType::Cancelled);
}

#[actix_web::test]
async fn cancel_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&customer_token(8), "/orders/1/cancel", &json!({}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient Permissions. Order 1 does not belong to this user"}"#);
}

#[actix_web::test]
async fn cancel_completed_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&customer_token(7), "/orders/3/cancel", &json!({}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        r#"{"error":"The request conflicts with the current state. Order 3 cannot change from Completed to Cancelled"}"#
    );
}

#[actix_web::test]
async fn managers_cancel_any_order() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_request(&manager_token(), "/orders/2/cancel", &json!({}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn complete_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&seller_token(5, 10), "/orders/1/complete", &json!({}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: OrderResult = serde_json::from_str(&body).unwrap();
    assert_eq!(result.order.status, OrderStatusType::Completed);
}

#[actix_web::test]
async fn complete_another_organizations_order() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_request(&seller_token(5, 20), "/orders/1/complete", &json!({}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = post_request(&customer_token(7), "/orders/1/complete", &json!({}), configure)
        .await
        .expect_err("Expected error");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn complete_expired_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&seller_token(5, 10), "/orders/4/complete", &json!({}), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"The request conflicts with the current state. Order 4 has expired"}"#);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut orders = MockOrderManager::new();
    orders.expect_place_order().withf(|order, _, _| order.customer_id == 7).returning(|order, _, _| {
        if order.lines.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        if let Some(line) = order.lines.iter().find(|l| l.quantity > 10) {
            let (offer_id, requested) = (line.price_offer_id, line.quantity);
            return Err(StockError::InsufficientStock { offer_id, requested, available: 10 }.into());
        }
        let mut placed = order_with_id(1);
        placed.memo = order.memo;
        let lines = order.lines.iter().map(|l| line(1, Some(l.price_offer_id), l.quantity)).collect();
        Ok(OrderResult { order: placed, lines, price_changes: vec![] })
    });
    orders.expect_fetch_order().returning(|id| Ok((id < 5).then(|| order_with_id(id))));
    orders.expect_fetch_order_lines().returning(|id| Ok(vec![line(id, Some(4), 2), line(id, None, 1)]));
    orders.expect_search_orders().returning(|query| {
        let customer_id = query.customer_id.unwrap_or(7);
        let organization_id = query.organization_id.unwrap_or(10);
        let statuses = query.status.unwrap_or_else(|| vec![OrderStatusType::New]);
        Ok(statuses.into_iter().zip(1..).map(|(s, id)| order(id, customer_id, organization_id, s)).collect())
    });
    orders.expect_annul_order().returning(|id, status, _| {
        let mut order = order_with_id(id);
        order.status = status;
        Ok(OrderResult { order, lines: vec![], price_changes: vec![] })
    });
    orders.expect_complete_order().returning(|id, _| {
        if id == 4 {
            return Err(OrderFlowError::OrderExpired(id));
        }
        let mut order = order_with_id(id);
        order.status = OrderStatusType::Completed;
        Ok(OrderResult { order, lines: vec![], price_changes: vec![] })
    });
    cfg.service(PlaceOrderRoute::<MockOrderManager>::new())
        .service(MyOrdersRoute::<MockOrderManager>::new())
        .service(OrderByIdRoute::<MockOrderManager>::new())
        .service(CancelOrderRoute::<MockOrderManager>::new())
        .service(CompleteOrderRoute::<MockOrderManager>::new())
        .app_data(web::Data::new(OrderFlowApi::new(orders, no_events())));
}

/// Orders 1, 3 and 4 belong to customer 7 at organization 10. Order 2 belongs to customer 8 at organization 20.
fn order_with_id(id: i64) -> Order {
    match id {
        2 => order(2, 8, 20, OrderStatusType::New),
        3 => order(3, 7, 10, OrderStatusType::Completed),
        id => order(id, 7, 10, OrderStatusType::New),
    }
}

fn line(order_id: i64, price_offer_id: Option<i64>, quantity: i64) -> OrderLine {
    OrderLine { id: order_id * 10, order_id, price_offer_id, product_id: 1, quantity, price: Money::from(1_250) }
}
