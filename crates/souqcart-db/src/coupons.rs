//! Database operations for `coupons`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use souqcart_core::coupons::normalize_code;
use souqcart_core::{Coupon, CouponKind, NewCoupon};

use crate::DbError;

const COUPON_COLUMNS: &str = "id, code, description, kind, value, min_order_amount, \
     max_discount_amount, usage_limit, used_count, start_date, end_date, active, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub kind: String,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl CouponRow {
    /// Convert into the domain type used by the validator.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidData`] if `kind` holds an unknown value.
    pub fn to_coupon(&self) -> Result<Coupon, DbError> {
        let kind = self
            .kind
            .parse::<CouponKind>()
            .map_err(|e| DbError::InvalidData(e.to_string()))?;
        Ok(Coupon {
            id: self.id,
            code: self.code.clone(),
            description: self.description.clone(),
            kind,
            value: self.value,
            min_order_amount: self.min_order_amount,
            max_discount_amount: self.max_discount_amount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            start_date: self.start_date,
            end_date: self.end_date,
            active: self.active,
        })
    }
}

/// Look up a coupon by code, case-insensitively.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_coupon_by_code(pool: &PgPool, code: &str) -> Result<Option<CouponRow>, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1"
    ))
    .bind(normalize_code(code))
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Most recently created coupons first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_coupons(pool: &PgPool, limit: i64) -> Result<Vec<CouponRow>, DbError> {
    let rows = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC, code LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Insert a coupon definition. Callers validate with
/// [`NewCoupon::validated`] first.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the code already exists, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn create_coupon(pool: &PgPool, coupon: &NewCoupon) -> Result<CouponRow, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "INSERT INTO coupons (code, description, kind, value, min_order_amount, \
                              max_discount_amount, usage_limit, start_date, end_date, active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {COUPON_COLUMNS}"
    ))
    .bind(normalize_code(&coupon.code))
    .bind(&coupon.description)
    .bind(coupon.kind.as_str())
    .bind(coupon.value)
    .bind(coupon.min_order_amount)
    .bind(coupon.max_discount_amount)
    .bind(coupon.usage_limit)
    .bind(coupon.start_date)
    .bind(coupon.end_date)
    .bind(coupon.active)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Record one use of a coupon.
///
/// The increment is a single conditional update, so concurrent consumers of
/// the last remaining use cannot both succeed. Returns `false` when the
/// coupon is exhausted (or no longer exists).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn consume_coupon<'e, E>(executor: E, coupon_id: Uuid) -> Result<bool, DbError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE coupons \
         SET used_count = used_count + 1 \
         WHERE id = $1 \
           AND (usage_limit IS NULL OR usage_limit = 0 OR used_count < usage_limit)",
    )
    .bind(coupon_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
