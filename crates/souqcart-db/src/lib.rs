use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use souqcart_core::AppConfig;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

const UNIQUE_VIOLATION: &str = "23505";

// Path relative to crates/souqcart-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    /// A compare-and-set update found the order in a different state than
    /// the caller read.
    #[error("order {order_id} changed concurrently; expected {expected}")]
    StaleOrderState { order_id: Uuid, expected: String },
    #[error("order number {0} already exists")]
    DuplicateOrderNumber(String),
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: Uuid },
    #[error("coupon {coupon_id} has reached its usage limit")]
    CouponExhausted { coupon_id: Uuid },
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("stored value is invalid: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Sqlx(sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return DbError::Conflict(constraint);
            }
        }
        DbError::Sqlx(error)
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table may not exist yet on a fresh database;
    // treat absence as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}


pub mod addresses;
pub mod analytics;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod seed;
pub mod users;
pub mod wishlist;

pub use addresses::{
    create_address, delete_address, get_address, list_addresses, set_default_address,
    update_address, AddressRow,
};
pub use analytics::{account_counts, product_counts, sales_groups, AccountCounts, ProductCounts};
pub use coupons::{consume_coupon, create_coupon, get_coupon_by_code, list_coupons, CouponRow};
pub use orders::{
    cancel_order, create_order, get_order, get_order_by_gateway_session, list_order_items,
    list_orders, order_vendor_ids, set_gateway_session, transition_order, NewOrder, OrderFilter,
    OrderItemRow, OrderPage, OrderRow,
};
pub use products::{
    create_product, deactivate_product, get_products_by_ids, list_active_products,
    update_product, NewProduct, ProductRow, ProductUpdate,
};
pub use seed::{seed_demo_data, SeedSummary};
pub use users::{
    create_session, create_user, create_vendor, delete_expired_sessions, get_user_by_email,
    get_vendor_by_user, list_vendors, set_vendor_approval, viewer_for_session, SessionRow,
    UserRow, VendorRow,
};
pub use wishlist::{add_to_wishlist, list_wishlist, remove_from_wishlist, WishlistRow};
