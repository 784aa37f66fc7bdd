use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{Error as SqlxError, SqliteConnection};

use crate::{
    db_types::{NewStockBalance, StockBalance},
    traits::OfferAvailability,
};

/// Offers joined with their warehouse name and the quantity held by reservations that are active at `$1`.
const OFFER_AVAILABILITY: &str = r#"
    SELECT o.*, o.amount - o.reserved AS available FROM (
        SELECT sb.*, w.name AS warehouse_name, (
            SELECT COALESCE(SUM(r.quantity), 0) FROM priced_product_reservations r
            WHERE r.price_offer_id = sb.id AND julianday(r.expires_at) > julianday($1)
        ) AS reserved
        FROM stock_balances sb JOIN warehouses w ON w.id = sb.warehouse_id
    ) o
"#;

/// Takes the write lock for the transaction. Returns `false` if the offer does not exist.
pub async fn lock_offer(id: i64, conn: &mut SqliteConnection) -> Result<bool, SqlxError> {
    let result =
        sqlx::query("UPDATE stock_balances SET updated_at = updated_at WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_offer(id: i64, conn: &mut SqliteConnection) -> Result<Option<StockBalance>, SqlxError> {
    sqlx::query_as("SELECT * FROM stock_balances WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Inserts the offer, or replaces price and amount of the existing offer for the same warehouse and product.
pub async fn upsert_offer(offer: NewStockBalance, conn: &mut SqliteConnection) -> Result<StockBalance, SqlxError> {
    let offer: StockBalance = sqlx::query_as(
        r#"
            INSERT INTO stock_balances (organization_id, warehouse_id, product_id, price, amount)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (warehouse_id, product_id) DO UPDATE SET
                price = excluded.price,
                amount = excluded.amount,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(offer.organization_id)
    .bind(offer.warehouse_id)
    .bind(offer.product_id)
    .bind(offer.price)
    .bind(offer.amount)
    .fetch_one(conn)
    .await?;
    debug!(
        "🗃️ Offer #{} now has {} units of product #{} at {}",
        offer.id, offer.amount, offer.product_id, offer.price
    );
    Ok(offer)
}

pub async fn delete_offer(id: i64, conn: &mut SqliteConnection) -> Result<Option<StockBalance>, SqlxError> {
    sqlx::query_as("DELETE FROM stock_balances WHERE id = $1 RETURNING *").bind(id).fetch_optional(conn).await
}

/// Writes `quantity` units off the offer's physical amount. Returns `None` if the offer does not exist.
///
/// The caller is responsible for checking availability first.
pub async fn decrement_amount(
    id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<StockBalance>, SqlxError> {
    sqlx::query_as(
        "UPDATE stock_balances SET amount = amount - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(quantity)
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn offer_availability(
    id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<OfferAvailability>, SqlxError> {
    let sql = format!("{OFFER_AVAILABILITY} WHERE o.id = $2");
    sqlx::query_as(&sql)
        .bind(now)
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn offers_for_organization(
    organization_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<OfferAvailability>, SqlxError> {
    let sql = format!("{OFFER_AVAILABILITY} WHERE o.organization_id = $2 ORDER BY o.product_id, o.price, o.id");
    sqlx::query_as(&sql)
        .bind(now)
        .bind(organization_id)
        .fetch_all(conn)
        .await
}

pub async fn offers_for_product(
    product_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<OfferAvailability>, SqlxError> {
    let sql = format!("{OFFER_AVAILABILITY} WHERE o.product_id = $2 ORDER BY o.price, o.id");
    sqlx::query_as(&sql)
        .bind(now)
        .bind(product_id)
        .fetch_all(conn)
        .await
}
