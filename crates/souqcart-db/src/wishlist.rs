//! Saved products per user.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use souqcart_core::WishlistItem;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WishlistRow {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistItem {
    fn from(row: WishlistRow) -> Self {
        Self {
            product_id: row.product_id,
            vendor_id: row.vendor_id,
            name: row.name,
            price: row.price,
        }
    }
}

/// The user's saved products, newest first, with current catalog data.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_wishlist(pool: &PgPool, user_id: Uuid) -> Result<Vec<WishlistRow>, DbError> {
    let rows = sqlx::query_as::<_, WishlistRow>(
        "SELECT p.id AS product_id, p.vendor_id, p.name, p.price, p.active, w.created_at \
         FROM wishlist_items w \
         JOIN products p ON p.id = w.product_id \
         WHERE w.user_id = $1 \
         ORDER BY w.created_at DESC, p.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Save a product. Returns false when it was already saved.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (for example, unknown
/// product).
pub async fn add_to_wishlist(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, product_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the product was not saved.
pub async fn remove_from_wishlist(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
