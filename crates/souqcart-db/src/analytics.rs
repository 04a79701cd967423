//! Aggregate queries behind the admin and vendor dashboards.
//!
//! Queries only group and count; [`souqcart_core::SalesSummary`] decides
//! what counts as a sale.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use souqcart_core::{OrderStatus, PaymentStatus, SalesGroup};

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct SalesGroupRow {
    status: String,
    payment_status: String,
    orders: i64,
    amount: Decimal,
}

impl SalesGroupRow {
    fn into_group(self) -> Result<SalesGroup, DbError> {
        Ok(SalesGroup {
            status: self
                .status
                .parse::<OrderStatus>()
                .map_err(|e| DbError::InvalidData(e.to_string()))?,
            payment_status: self
                .payment_status
                .parse::<PaymentStatus>()
                .map_err(|e| DbError::InvalidData(e.to_string()))?,
            orders: self.orders,
            amount: self.amount,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct AccountCounts {
    pub customers: i64,
    pub vendors: i64,
    pub pending_vendors: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductCounts {
    pub products: i64,
    pub active_products: i64,
}

/// Orders grouped by status pair.
///
/// Without a vendor the amount is the order total. For a vendor, only
/// orders with at least one of its lines are counted and the amount is the
/// value of those lines (before discount, shipping and tax).
///
/// # Errors
///
/// Returns [`DbError::InvalidData`] for an unknown stored status, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn sales_groups(
    pool: &PgPool,
    vendor_id: Option<Uuid>,
) -> Result<Vec<SalesGroup>, DbError> {
    let rows = match vendor_id {
        None => {
            sqlx::query_as::<_, SalesGroupRow>(
                "SELECT status, payment_status, COUNT(*) AS orders, \
                        COALESCE(SUM(total), 0) AS amount \
                 FROM orders \
                 GROUP BY status, payment_status",
            )
            .fetch_all(pool)
            .await?
        }
        Some(vendor_id) => {
            sqlx::query_as::<_, SalesGroupRow>(
                "SELECT o.status, o.payment_status, COUNT(DISTINCT o.id) AS orders, \
                        COALESCE(SUM(i.unit_price * i.quantity), 0) AS amount \
                 FROM order_items i \
                 JOIN orders o ON o.id = i.order_id \
                 WHERE i.vendor_id = $1 \
                 GROUP BY o.status, o.payment_status",
            )
            .bind(vendor_id)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(SalesGroupRow::into_group).collect()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn account_counts(pool: &PgPool) -> Result<AccountCounts, DbError> {
    let counts = sqlx::query_as::<_, AccountCounts>(
        "SELECT \
             (SELECT COUNT(*) FROM users WHERE role = 'customer') AS customers, \
             (SELECT COUNT(*) FROM vendors) AS vendors, \
             (SELECT COUNT(*) FROM vendors WHERE NOT approved) AS pending_vendors",
    )
    .fetch_one(pool)
    .await?;

    Ok(counts)
}

/// Catalog size, for one vendor or the whole marketplace.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_counts(
    pool: &PgPool,
    vendor_id: Option<Uuid>,
) -> Result<ProductCounts, DbError> {
    let counts = sqlx::query_as::<_, ProductCounts>(
        "SELECT COUNT(*) AS products, \
                COUNT(*) FILTER (WHERE active) AS active_products \
         FROM products \
         WHERE $1::uuid IS NULL OR vendor_id = $1",
    )
    .bind(vendor_id)
    .fetch_one(pool)
    .await?;

    Ok(counts)
}
