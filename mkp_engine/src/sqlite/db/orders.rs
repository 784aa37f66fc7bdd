use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{Error as SqlxError, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Money, Order, OrderLine, OrderStatusType},
    mkp_api::order_objects::OrderQueryFilter,
};

/// The header of an order, before any lines are attached.
#[derive(Debug, Clone)]
pub struct OrderHeader {
    pub customer_id: i64,
    pub organization_id: i64,
    pub order_request_id: Option<i64>,
    pub memo: Option<String>,
    pub expires_at: DateTime<Utc>,
}

pub async fn insert_order(header: OrderHeader, conn: &mut SqliteConnection) -> Result<Order, SqlxError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (customer_id, organization_id, order_request_id, memo, status, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(header.customer_id)
    .bind(header.organization_id)
    .bind(header.order_request_id)
    .bind(header.memo)
    .bind(OrderStatusType::New.to_string())
    .bind(header.expires_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} created for customer {}", order.id, order.customer_id);
    Ok(order)
}

pub async fn insert_line(
    order_id: i64,
    price_offer_id: i64,
    product_id: i64,
    quantity: i64,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<OrderLine, SqlxError> {
    sqlx::query_as(
        r#"
            INSERT INTO order_lines (order_id, price_offer_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(price_offer_id)
    .bind(product_id)
    .bind(quantity)
    .bind(price)
    .fetch_one(conn)
    .await
}

pub async fn set_total_price(id: i64, total: Money, conn: &mut SqliteConnection) -> Result<Order, SqlxError> {
    sqlx::query_as("UPDATE orders SET total_price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(total)
        .bind(id)
        .fetch_one(conn)
        .await
}

/// Takes the write lock for the transaction. Returns `false` if the order does not exist.
pub async fn lock_order(id: i64, conn: &mut SqliteConnection) -> Result<bool, SqlxError> {
    let result = sqlx::query("UPDATE orders SET updated_at = updated_at WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, SqlxError> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_lines(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, SqlxError> {
    sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqlxError> {
    sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(status.to_string())
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Marks every `New` order whose expiry has passed at `now` as `Expired`.
pub async fn expire_new_orders(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Order>, SqlxError> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE status = $2 AND julianday(expires_at) <= julianday($3)
            RETURNING *;
        "#,
    )
    .bind(OrderStatusType::Expired.to_string())
    .bind(OrderStatusType::New.to_string())
    .bind(now)
    .fetch_all(conn)
    .await?;
    if !orders.is_empty() {
        debug!("🗃️ {} orders have expired", orders.len());
    }
    Ok(orders)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, SqlxError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(org_id) = query.organization_id {
        where_clause.push("organization_id = ");
        where_clause.push_bind_unseparated(org_id);
    }
    if let Some(request_id) = query.order_request_id {
        where_clause.push("order_request_id = ");
        where_clause.push_bind_unseparated(request_id);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        let mut first = true;
        for status in statuses {
            if !first {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.to_string());
            first = false;
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("julianday(created_at) >= julianday(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("julianday(created_at) <= julianday(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}
