//! Database operations for `orders` and `order_items`.
//!
//! Orders are created once, in a single transaction that also decrements
//! stock and consumes the coupon. Afterwards only the status pair and the
//! gateway fields change, always through a compare-and-set on the state the
//! caller read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use souqcart_core::{
    AddressSnapshot, CartLine, OrderScope, OrderState, OrderStatus, PaymentMethod,
    PaymentStatus, PricingBreakdown, ShippingMethod,
};

use crate::coupons::consume_coupon;
use crate::DbError;

const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

const ORDER_COLUMNS: &str = "id, order_number, user_id, coupon_id, subtotal, shipping_cost, \
     tax, discount, total, status, payment_status, payment_method, shipping_method, \
     shipping_address, notes, gateway_session_id, gateway_payment_id, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, position, product_id, vendor_id, name, unit_price, quantity, variant_label";

// Shared by the list and count queries; binds $1 user, $2 vendor, $3 status.
const SCOPE_PREDICATE: &str = "($1::uuid IS NULL OR o.user_id = $1) \
     AND ($2::uuid IS NULL OR EXISTS ( \
            SELECT 1 FROM order_items i WHERE i.order_id = o.id AND i.vendor_id = $2)) \
     AND ($3::text IS NULL OR o.status = $3)";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub coupon_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub shipping_method: String,
    pub shipping_address: Json<AddressSnapshot>,
    pub notes: Option<String>,
    pub gateway_session_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    /// Parse the stored status pair.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if either column holds an unknown
    /// value.
    pub fn state(&self) -> Result<OrderState, DbError> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| DbError::InvalidData(e.to_string()))?;
        let payment_status = self
            .payment_status
            .parse::<PaymentStatus>()
            .map_err(|e| DbError::InvalidData(e.to_string()))?;
        Ok(OrderState {
            status,
            payment_status,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub variant_label: Option<String>,
}

/// Everything needed to persist a checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Uuid,
    pub coupon_id: Option<Uuid>,
    pub pricing: PricingBreakdown,
    pub state: OrderState,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub shipping_address: AddressSnapshot,
    pub notes: Option<String>,
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, Copy)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// 1-based.
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<OrderRow>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Persist a new order with its line items.
///
/// In one transaction: inserts the order, inserts each line, decrements the
/// stock of each product (guarded by `stock >= quantity`), and consumes the
/// coupon when one is applied. Any failure rolls the whole checkout back.
///
/// # Errors
///
/// - [`DbError::DuplicateOrderNumber`] if the order number is taken; the
///   caller may regenerate and retry.
/// - [`DbError::InsufficientStock`] if a product is inactive or short.
/// - [`DbError::CouponExhausted`] if the coupon's last use went elsewhere.
/// - [`DbError::Sqlx`] for any other database failure.
pub async fn create_order(
    pool: &PgPool,
    order: &NewOrder,
) -> Result<(OrderRow, Vec<OrderItemRow>), DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders (order_number, user_id, coupon_id, subtotal, shipping_cost, tax, \
                             discount, total, status, payment_status, payment_method, \
                             shipping_method, shipping_address, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(order.coupon_id)
    .bind(order.pricing.subtotal)
    .bind(order.pricing.shipping_cost)
    .bind(order.pricing.tax)
    .bind(order.pricing.discount)
    .bind(order.pricing.total)
    .bind(order.state.status.as_str())
    .bind(order.state.payment_status.as_str())
    .bind(order.payment_method.as_str())
    .bind(order.shipping_method.as_str())
    .bind(Json(&order.shipping_address))
    .bind(&order.notes)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::Conflict(constraint) if constraint == ORDER_NUMBER_CONSTRAINT => {
            DbError::DuplicateOrderNumber(order.order_number.clone())
        }
        other => other,
    })?;

    let mut items = Vec::with_capacity(order.lines.len());
    for (position, line) in order.lines.iter().enumerate() {
        let quantity = i32::try_from(line.quantity)
            .map_err(|_| DbError::InvalidData(format!("quantity {} too large", line.quantity)))?;
        let position = i32::try_from(position)
            .map_err(|_| DbError::InvalidData("too many order lines".to_string()))?;

        let decremented = sqlx::query(
            "UPDATE products \
             SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND active AND stock >= $2",
        )
        .bind(line.product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            return Err(DbError::InsufficientStock {
                product_id: line.product_id,
            });
        }

        let item = sqlx::query_as::<_, OrderItemRow>(&format!(
            "INSERT INTO order_items (order_id, position, product_id, vendor_id, name, \
                                      unit_price, quantity, variant_label) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(row.id)
        .bind(position)
        .bind(line.product_id)
        .bind(line.vendor_id)
        .bind(&line.name)
        .bind(line.unit_price)
        .bind(quantity)
        .bind(&line.variant_label)
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }

    if let Some(coupon_id) = order.coupon_id {
        if !consume_coupon(&mut *tx, coupon_id).await? {
            return Err(DbError::CouponExhausted { coupon_id });
        }
    }

    tx.commit().await?;
    Ok((row, items))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::NotFound`] if no order has this id.
pub async fn get_order(pool: &PgPool, id: Uuid) -> Result<OrderRow, DbError> {
    sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no order is linked to this session.
pub async fn get_order_by_gateway_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<OrderRow, DbError> {
    sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_session_id = $1"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Line items in checkout order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_order_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItemRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY position"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Distinct vendors with at least one line in the order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn order_vendor_ids(pool: &PgPool, order_id: Uuid) -> Result<Vec<Uuid>, DbError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT vendor_id FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Orders visible under `scope`, newest first, one page at a time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_orders(
    pool: &PgPool,
    scope: OrderScope,
    filter: &OrderFilter,
) -> Result<OrderPage, DbError> {
    let (user_id, vendor_id) = match scope {
        OrderScope::Own(user_id) => (Some(user_id), None),
        OrderScope::Vendor(vendor_id) => (None, Some(vendor_id)),
        OrderScope::All => (None, None),
        OrderScope::Nothing => {
            return Ok(OrderPage {
                orders: Vec::new(),
                total: 0,
                page: filter.page,
                limit: filter.limit,
            })
        }
    };
    let status = filter.status.map(OrderStatus::as_str);
    let offset = (filter.page.max(1) - 1) * filter.limit;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM orders o WHERE {SCOPE_PREDICATE}"
    ))
    .bind(user_id)
    .bind(vendor_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    let orders = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders o \
         WHERE {SCOPE_PREDICATE} \
         ORDER BY o.created_at DESC, o.id DESC \
         LIMIT $4 OFFSET $5"
    ))
    .bind(user_id)
    .bind(vendor_id)
    .bind(status)
    .bind(filter.limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(OrderPage {
        orders,
        total,
        page: filter.page,
        limit: filter.limit,
    })
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

async fn compare_and_set<'e, E>(
    executor: E,
    order_id: Uuid,
    expected: OrderState,
    next: OrderState,
    gateway_payment_id: Option<&str>,
) -> Result<Option<OrderRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders \
         SET status = $2, payment_status = $3, \
             gateway_payment_id = COALESCE($4, gateway_payment_id), updated_at = NOW() \
         WHERE id = $1 AND status = $5 AND payment_status = $6 \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(next.status.as_str())
    .bind(next.payment_status.as_str())
    .bind(gateway_payment_id)
    .bind(expected.status.as_str())
    .bind(expected.payment_status.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

fn stale(order_id: Uuid, expected: OrderState) -> DbError {
    DbError::StaleOrderState {
        order_id,
        expected: format!("{}/{}", expected.status, expected.payment_status),
    }
}

/// Move an order from `expected` to `next`.
///
/// The update only applies while the order still holds `expected`, so two
/// concurrent transitions from the same state cannot both win.
/// `gateway_payment_id` is recorded when given and kept otherwise.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist,
/// [`DbError::StaleOrderState`] if its state changed since it was read, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn transition_order(
    pool: &PgPool,
    order_id: Uuid,
    expected: OrderState,
    next: OrderState,
    gateway_payment_id: Option<&str>,
) -> Result<OrderRow, DbError> {
    match compare_and_set(pool, order_id, expected, next, gateway_payment_id).await? {
        Some(row) => Ok(row),
        None => {
            get_order(pool, order_id).await?;
            Err(stale(order_id, expected))
        }
    }
}

/// Cancel an order and return its stock and coupon use.
///
/// # Errors
///
/// Same as [`transition_order`].
pub async fn cancel_order(
    pool: &PgPool,
    order_id: Uuid,
    expected: OrderState,
    next: OrderState,
) -> Result<OrderRow, DbError> {
    let mut tx = pool.begin().await?;

    let Some(row) = compare_and_set(&mut *tx, order_id, expected, next, None).await? else {
        drop(tx);
        get_order(pool, order_id).await?;
        return Err(stale(order_id, expected));
    };

    // Lines of one product (different variants) are summed first: an
    // UPDATE ... FROM applies a single joined row per product.
    sqlx::query(
        "UPDATE products p \
         SET stock = p.stock + i.quantity, updated_at = NOW() \
         FROM ( \
             SELECT product_id, SUM(quantity)::int AS quantity \
             FROM order_items WHERE order_id = $1 GROUP BY product_id \
         ) i \
         WHERE p.id = i.product_id",
    )
    .bind(order_id)
    .execute(&mut *tx)
    .await?;

    if let Some(coupon_id) = row.coupon_id {
        sqlx::query(
            "UPDATE coupons SET used_count = used_count - 1 WHERE id = $1 AND used_count > 0",
        )
        .bind(coupon_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(order_id = %order_id, "order cancelled; stock released");
    Ok(row)
}

/// Link an order to the gateway checkout session created for it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist.
pub async fn set_gateway_session(
    pool: &PgPool,
    order_id: Uuid,
    session_id: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE orders SET gateway_session_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(order_id)
    .bind(session_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
