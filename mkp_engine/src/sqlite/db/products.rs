use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{Error as SqlxError, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{MinPriceChange, Money, NewProduct, Product},
    mkp_api::price_objects::{Pagination, ProductQueryFilter},
    traits::CatalogError,
};

/// The cheapest offer of a product that still has unreserved stock at `$2`.
const MIN_AVAILABLE_PRICE: &str = r#"
    SELECT MIN(sb.price) FROM stock_balances sb
    WHERE sb.product_id = $1 AND sb.amount > (
        SELECT COALESCE(SUM(r.quantity), 0) FROM priced_product_reservations r
        WHERE r.price_offer_id = sb.id AND julianday(r.expires_at) > julianday($2)
    )
"#;

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, CatalogError> {
    let result = sqlx::query_as::<_, Product>("INSERT INTO products (sku, name) VALUES ($1, $2) RETURNING *")
        .bind(&product.sku)
        .bind(&product.name)
        .fetch_one(conn)
        .await;
    match result {
        Ok(p) => {
            debug!("🗃️ Product #{} [{}] added to the catalog", p.id, p.sku);
            Ok(p)
        },
        Err(SqlxError::Database(e)) if e.is_unique_violation() => Err(CatalogError::DuplicateSku(product.sku)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, SqlxError> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Takes the write lock for the transaction. Returns `false` if the product does not exist.
pub async fn lock_product(id: i64, conn: &mut SqliteConnection) -> Result<bool, SqlxError> {
    let result = sqlx::query("UPDATE products SET updated_at = updated_at WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn search_products(
    filter: ProductQueryFilter,
    page: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, SqlxError> {
    let mut builder = QueryBuilder::new("SELECT * FROM products ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(name) = filter.name {
        // LIKE is case-insensitive for ASCII in SQLite
        where_clause.push("name LIKE ");
        where_clause.push_bind_unseparated(format!("%{}%", escape_like(&name)));
        where_clause.push_unseparated(" ESCAPE '\\'");
    }
    if let Some(sku) = filter.sku {
        where_clause.push("sku = ");
        where_clause.push_bind_unseparated(sku);
    }
    if filter.in_stock {
        where_clause.push("min_price IS NOT NULL");
    }
    builder.push(" ORDER BY id ASC LIMIT ");
    builder.push_bind(page.count);
    builder.push(" OFFSET ");
    builder.push_bind(page.offset);
    trace!("🗃️ Executing query: {}", builder.sql());
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

/// Escapes the LIKE wildcards so that the pattern matches the text literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Brings `products.min_price` in line with the offers that have stock available at `now`.
///
/// Returns `None` if the product does not exist or its price was already correct.
pub async fn recompute_min_price(
    product_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<MinPriceChange>, SqlxError> {
    let stored: Option<Option<Money>> = sqlx::query_scalar("SELECT min_price FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(old_price) = stored else {
        return Ok(None);
    };
    let new_price: Option<Money> =
        sqlx::query_scalar(MIN_AVAILABLE_PRICE).bind(product_id).bind(now).fetch_one(&mut *conn).await?;
    if old_price == new_price {
        return Ok(None);
    }
    sqlx::query("UPDATE products SET min_price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(new_price)
        .bind(product_id)
        .execute(conn)
        .await?;
    let change = MinPriceChange { product_id, old_price, new_price };
    debug!("🗃️ Min price changed for {change}");
    Ok(Some(change))
}

/// Recomputes the minimum price of each distinct product in `product_ids`.
pub async fn recompute_min_prices(
    product_ids: &[i64],
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<MinPriceChange>, SqlxError> {
    let mut ids = product_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    let mut changes = Vec::new();
    for id in ids {
        if let Some(change) = recompute_min_price(id, now, conn).await? {
            changes.push(change);
        }
    }
    Ok(changes)
}
