//! Catalog products. Checkout reads prices and stock from here; stock is
//! decremented by [`crate::orders::create_order`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub active: bool,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (for example, a
/// non-positive price rejected by the table's check constraint).
pub async fn create_product(
    pool: &PgPool,
    vendor_id: Uuid,
    product: &NewProduct,
) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products (vendor_id, name, price, stock, active) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, vendor_id, name, price, stock, active, created_at, updated_at",
    )
    .bind(vendor_id)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.active)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Active products, newest first, optionally restricted to one vendor.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_products(
    pool: &PgPool,
    vendor_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, vendor_id, name, price, stock, active, created_at, updated_at \
         FROM products \
         WHERE active AND ($1::uuid IS NULL OR vendor_id = $1) \
         ORDER BY created_at DESC, id \
         LIMIT $2",
    )
    .bind(vendor_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch the products with the given ids. Missing ids are simply absent
/// from the result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_products_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, vendor_id, name, price, stock, active, created_at, updated_at \
         FROM products \
         WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fields a vendor may change on a listed product; `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub active: Option<bool>,
}

/// Apply `update` to a product of `vendor_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist or belongs
/// to another vendor, or [`DbError::Sqlx`] if a check constraint rejects
/// the new values.
pub async fn update_product(
    pool: &PgPool,
    vendor_id: Uuid,
    product_id: Uuid,
    update: &ProductUpdate,
) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(
        "UPDATE products SET \
             name = COALESCE($3, name), \
             price = COALESCE($4, price), \
             stock = COALESCE($5, stock), \
             active = COALESCE($6, active), \
             updated_at = NOW() \
         WHERE id = $1 AND vendor_id = $2 \
         RETURNING id, vendor_id, name, price, stock, active, created_at, updated_at",
    )
    .bind(product_id)
    .bind(vendor_id)
    .bind(update.name.as_deref())
    .bind(update.price)
    .bind(update.stock)
    .bind(update.active)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Take a product off the catalog. Rows stay in place because order lines
/// keep referencing them.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist or belongs
/// to another vendor.
pub async fn deactivate_product(
    pool: &PgPool,
    vendor_id: Uuid,
    product_id: Uuid,
) -> Result<ProductRow, DbError> {
    update_product(
        pool,
        vendor_id,
        product_id,
        &ProductUpdate {
            active: Some(false),
            ..ProductUpdate::default()
        },
    )
    .await
}
