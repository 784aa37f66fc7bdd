use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{Error as SqlxError, SqliteConnection};

use crate::{
    db_types::{NewReservation, PricedProductReservation, ReservationKey, StockBalance},
    sqlite::db::stock_balances,
    traits::StockError,
};

/// The outcome of a successful [`reserve`] call.
#[derive(Debug, Clone)]
pub struct Reserved {
    pub reservation: PricedProductReservation,
    pub offer: StockBalance,
    /// Units of the offer still free after this reservation
    pub available: i64,
}

/// Reserves stock against a price offer.
///
/// This must run inside a transaction. The first statement takes the write lock on the offer, so that no other
/// reservation can change the offer's availability between the check and the write below.
pub async fn reserve(
    reservation: &NewReservation,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Reserved, StockError> {
    let key = &reservation.key;
    let count = reservation.count;
    if count <= 0 {
        return Err(StockError::InvalidQuantity(count));
    }
    if !stock_balances::lock_offer(key.price_offer_id, conn).await? {
        return Err(StockError::OfferNotFound(key.price_offer_id));
    }
    let offer = stock_balances::fetch_offer(key.price_offer_id, conn)
        .await?
        .ok_or(StockError::OfferNotFound(key.price_offer_id))?;
    if key.product_id != offer.product_id {
        return Err(StockError::ProductMismatch {
            offer_id: offer.id,
            offer_product_id: offer.product_id,
            requested_product_id: key.product_id,
        });
    }
    let existing = fetch_by_key(key, conn).await?;
    let others = reserved_quantity(offer.id, now, existing.as_ref().map(|r| r.id), conn).await?;
    let available = offer.amount - others;
    trace!("🗃️ Offer #{} has {available} of {} units free for [{key}]", offer.id, offer.amount);
    if available < count {
        debug!("🗃️ Cannot reserve {count} units of offer #{}. Only {available} are available", offer.id);
        return Err(StockError::InsufficientStock { offer_id: offer.id, requested: count, available });
    }
    let reservation = match existing {
        Some(r) => update_reservation(r.id, count, expires_at, conn).await?,
        None => insert_reservation(key, count, expires_at, conn).await?,
    };
    debug!("🗃️ Reservation #{} holds {count} units of offer #{} until {expires_at}", reservation.id, offer.id);
    Ok(Reserved { reservation, offer, available: available - count })
}

/// Finds the reservation with exactly this key. Absent ids only match absent ids.
pub async fn fetch_by_key(
    key: &ReservationKey,
    conn: &mut SqliteConnection,
) -> Result<Option<PricedProductReservation>, SqlxError> {
    sqlx::query_as(
        r#"
            SELECT * FROM priced_product_reservations
            WHERE price_offer_id = $1
              AND product_id = $2
              AND order_id IS $3
              AND offer_id IS $4
              AND request_product_id IS $5
              AND offer_product_id IS $6
            LIMIT 1
        "#,
    )
    .bind(key.price_offer_id)
    .bind(key.product_id)
    .bind(key.order_id)
    .bind(key.offer_id)
    .bind(key.request_product_id)
    .bind(key.offer_product_id)
    .fetch_optional(conn)
    .await
}

/// Sum of quantities held against the offer by reservations that are active at `now`, optionally ignoring one
/// reservation.
pub async fn reserved_quantity(
    offer_id: i64,
    now: DateTime<Utc>,
    exclude: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<i64, SqlxError> {
    sqlx::query_scalar(
        r#"
            SELECT COALESCE(SUM(quantity), 0) FROM priced_product_reservations
            WHERE price_offer_id = $1 AND julianday(expires_at) > julianday($2) AND id IS NOT $3
        "#,
    )
    .bind(offer_id)
    .bind(now)
    .bind(exclude)
    .fetch_one(conn)
    .await
}

async fn insert_reservation(
    key: &ReservationKey,
    quantity: i64,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PricedProductReservation, SqlxError> {
    sqlx::query_as(
        r#"
            INSERT INTO priced_product_reservations (
                price_offer_id,
                product_id,
                order_id,
                offer_id,
                request_product_id,
                offer_product_id,
                quantity,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(key.price_offer_id)
    .bind(key.product_id)
    .bind(key.order_id)
    .bind(key.offer_id)
    .bind(key.request_product_id)
    .bind(key.offer_product_id)
    .bind(quantity)
    .bind(expires_at)
    .fetch_one(conn)
    .await
}

async fn update_reservation(
    id: i64,
    quantity: i64,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PricedProductReservation, SqlxError> {
    sqlx::query_as(
        r#"
            UPDATE priced_product_reservations
            SET quantity = $1, expires_at = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(expires_at)
    .bind(id)
    .fetch_one(conn)
    .await
}

pub async fn fetch_reservation(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PricedProductReservation>, SqlxError> {
    sqlx::query_as("SELECT * FROM priced_product_reservations WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn delete_reservation(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PricedProductReservation>, SqlxError> {
    sqlx::query_as("DELETE FROM priced_product_reservations WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn reservations_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PricedProductReservation>, SqlxError> {
    sqlx::query_as("SELECT * FROM priced_product_reservations WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub async fn delete_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PricedProductReservation>, SqlxError> {
    sqlx::query_as("DELETE FROM priced_product_reservations WHERE order_id = $1 RETURNING *")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

/// Deletes every reservation that has lapsed at `now`.
pub async fn delete_expired(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PricedProductReservation>, SqlxError> {
    let released: Vec<PricedProductReservation> = sqlx::query_as(
        "DELETE FROM priced_product_reservations WHERE julianday(expires_at) <= julianday($1) RETURNING *",
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    if !released.is_empty() {
        debug!("🗃️ {} lapsed reservations deleted", released.len());
    }
    Ok(released)
}

/// Number of reservations on the offer that are active at `now`.
pub async fn active_count_for_offer(
    offer_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, SqlxError> {
    sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM priced_product_reservations
            WHERE price_offer_id = $1 AND julianday(expires_at) > julianday($2)
        "#,
    )
    .bind(offer_id)
    .bind(now)
    .fetch_one(conn)
    .await
}
