use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use mkp_engine::{
    db_types::{MinPriceChange, Money, NewProduct, Organization, Product, StockBalance},
    traits::OfferAvailability,
    CatalogApi,
    StockApi,
    StockError,
};
use serde_json::{json, Value};

use super::{
    helpers::{manager_token, no_events, post_request, public_get_request, seller_token, send},
    mocks::{MockCatalogManager, MockStockManager},
};
use crate::{
    middleware::ACCESS_TOKEN_HEADER,
    routes::{
        health,
        CreateOrganizationRoute,
        CreateProductRoute,
        ProductByIdRoute,
        ProductPricesRoute,
        SearchProductsRoute,
        UpdateMinPriceRoute,
    },
};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_get_request("/health", |cfg| {
        cfg.service(health);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn fetch_product() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_get_request("/catalog/products/1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let product: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(product["sku"], "BOLT-M8");
    assert_eq!(product["min_price"], 1_200);
}

#[actix_web::test]
async fn fetch_missing_product() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_get_request("/catalog/products/5", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Product 5"}"#);
}

#[actix_web::test]
async fn search_normalizes_the_sku() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        public_get_request("/catalog/products?sku=bolt-m8&in_stock=true", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let products: Vec<Product> = serde_json::from_str(&body).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, 1);
}

#[actix_web::test]
async fn search_rejects_negative_paging() {
    let _ = env_logger::try_init().ok();
    let (status, _) = public_get_request("/catalog/products?offset=-1", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn product_prices_are_grouped_by_warehouse() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_get_request("/catalog/products/1/prices", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let prices: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(prices["product_id"], 1);
    assert_eq!(prices["min_price"], 1_200);
    assert_eq!(prices["total_groups"], 3);
    let warehouses = prices["warehouses"].as_array().unwrap();
    // Cheapest available group first; the sold out warehouse sorts last
    let ids = warehouses.iter().map(|w| w["warehouse_id"].as_i64().unwrap()).collect::<Vec<_>>();
    assert_eq!(ids, vec![20, 10, 30]);
    assert_eq!(warehouses[0]["offers"][0]["available"], 4);
    assert_eq!(warehouses[2]["min_price"], Value::Null);
}

#[actix_web::test]
async fn product_prices_in_stock_only_and_paged() {
    let _ = env_logger::try_init().ok();
    let path = "/catalog/products/1/prices?in_stock_only=true&offset=1&count=5";
    let (status, body) = public_get_request(path, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let prices: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(prices["total_groups"], 2);
    assert_eq!(prices["offset"], 1);
    assert_eq!(prices["count"], 1);
    assert_eq!(prices["warehouses"][0]["warehouse_id"], 10);
}

#[actix_web::test]
async fn product_prices_for_unknown_product() {
    let _ = env_logger::try_init().ok();
    let (status, body) = public_get_request("/catalog/products/77/prices", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Product 77 does not exist"}"#);
}

#[actix_web::test]
async fn create_product_as_manager() {
    let _ = env_logger::try_init().ok();
    let body = NewProduct::new(" nut-m8 ", "M8 hex nut");
    let (status, body) =
        post_request(&manager_token(), "/products", &body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let product: Product = serde_json::from_str(&body).unwrap();
    assert_eq!(product.sku, "NUT-M8");
    assert_eq!(product.min_price, None);
}

#[actix_web::test]
async fn create_product_with_the_access_token_header() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/products")
        .insert_header((ACCESS_TOKEN_HEADER, manager_token()))
        .set_json(NewProduct::new("NUT-M10", "M10 hex nut"));
    let (status, _) = send(req, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn create_product_with_invalid_sku() {
    let _ = env_logger::try_init().ok();
    let body = NewProduct::new("not a sku", "Broken");
    let (status, body) =
        post_request(&manager_token(), "/products", &body, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid request. 'not a sku' is not a valid SKU"}"#);
}

#[actix_web::test]
async fn sellers_cannot_create_products() {
    let _ = env_logger::try_init().ok();
    let body = NewProduct::new("NUT-M8", "M8 hex nut");
    let (status, msg) =
        post_request(&seller_token(5, 10), "/products", &body, configure).await.expect_err("Expected error");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(msg, "Authentication Error. Insufficient Permissions. Insufficient permissions.");
}

#[actix_web::test]
async fn anonymous_callers_cannot_create_products() {
    let _ = env_logger::try_init().ok();
    let body = NewProduct::new("NUT-M8", "M8 hex nut");
    let (status, msg) = post_request("", "/products", &body, configure).await.expect_err("Expected error");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(msg, "Authentication Error. No access token was provided.");
}

#[actix_web::test]
async fn forged_tokens_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut token = manager_token();
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    let body = NewProduct::new("NUT-M8", "M8 hex nut");
    let (status, _) = post_request(&token, "/products", &body, configure).await.expect_err("Expected error");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_organization() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(&manager_token(), "/organizations", &json!({"name": "  Acme Bolts "}), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let org: Organization = serde_json::from_str(&body).unwrap();
    assert_eq!(org.name, "Acme Bolts");
}

#[actix_web::test]
async fn update_min_price() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(&manager_token(), "/products/1/min_price", &json!({}), configure)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["changed"], true);
    assert_eq!(result["change"]["old_price"], 1_500);
    assert_eq!(result["change"]["new_price"], 1_200);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut catalog = MockCatalogManager::new();
    catalog.expect_fetch_product().returning(|id| Ok((id == 1).then(|| product(1, "BOLT-M8", Some(1_200)))));
    catalog
        .expect_search_products()
        .withf(|filter, _| filter.sku.as_deref() == Some("BOLT-M8") && filter.in_stock)
        .returning(|_, _| Ok(vec![product(1, "BOLT-M8", Some(1_200))]));
    catalog.expect_create_product().returning(|p| {
        let mut product = product(9, &p.sku, None);
        product.name = p.name;
        Ok(product)
    });
    catalog.expect_create_organization().returning(|name| {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        Ok(Organization { id: 3, name: name.to_string(), created_at: now, updated_at: now })
    });
    let mut stock = MockStockManager::new();
    stock.expect_offers_for_product().returning(|id, _| match id {
        1 => Ok(vec![offer(1, 10, 1_500, 10, 2), offer(2, 20, 1_200, 5, 1), offer(3, 30, 900, 3, 3)]),
        id => Err(StockError::ProductNotFound(id)),
    });
    stock.expect_update_product_min_price().returning(|id, _| {
        let (old_price, new_price) = (Some(Money::from(1_500)), Some(Money::from(1_200)));
        Ok(Some(MinPriceChange { product_id: id, old_price, new_price }))
    });
    cfg.service(SearchProductsRoute::<MockCatalogManager>::new())
        .service(ProductPricesRoute::<MockStockManager>::new())
        .service(ProductByIdRoute::<MockCatalogManager>::new())
        .service(CreateProductRoute::<MockCatalogManager>::new())
        .service(CreateOrganizationRoute::<MockCatalogManager>::new())
        .service(UpdateMinPriceRoute::<MockStockManager>::new())
        .app_data(web::Data::new(CatalogApi::new(catalog)))
        .app_data(web::Data::new(StockApi::new(stock, no_events())));
}

fn product(id: i64, sku: &str, min_price: Option<i64>) -> Product {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    Product {
        id,
        sku: sku.to_string(),
        name: "M8 bolt".to_string(),
        min_price: min_price.map(Money::from),
        created_at: now,
        updated_at: now,
    }
}

fn offer(id: i64, warehouse_id: i64, price: i64, amount: i64, reserved: i64) -> OfferAvailability {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    OfferAvailability {
        offer: StockBalance {
            id,
            organization_id: warehouse_id / 10,
            warehouse_id,
            product_id: 1,
            price: Money::from(price),
            amount,
            created_at: now,
            updated_at: now,
        },
        warehouse_name: format!("Warehouse {warehouse_id}"),
        reserved,
        available: amount - reserved,
    }
}
