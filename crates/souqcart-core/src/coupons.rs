//! Coupon rules: definition checks, validation against an order total, and
//! discount computation.
//!
//! Validation here never mutates a coupon. Consuming a use is the persistence
//! layer's job and happens once per created order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{round_money, CoreError};

const MAX_CODE_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    Percentage,
    Fixed,
}

impl CouponKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CouponKind::Percentage => "percentage",
            CouponKind::Fixed => "fixed",
        }
    }
}

impl std::str::FromStr for CouponKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "percentage" => Ok(CouponKind::Percentage),
            "fixed" => Ok(CouponKind::Fixed),
            other => Err(CoreError::Validation(format!(
                "coupon kind must be 'percentage' or 'fixed', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    /// Only meaningful for [`CouponKind::Percentage`].
    pub max_discount_amount: Option<Decimal>,
    /// `None` or `Some(0)` means unlimited.
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
}

impl Coupon {
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        match self.usage_limit {
            Some(limit) if limit > 0 => self.used_count >= limit,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_date && now <= self.end_date
    }

    /// Discount for `order_total`, before clamping and rounding.
    #[must_use]
    pub fn raw_discount(&self, order_total: Decimal) -> Decimal {
        match self.kind {
            CouponKind::Percentage => {
                let discount = order_total * self.value / Decimal::ONE_HUNDRED;
                match self.max_discount_amount {
                    Some(cap) if discount > cap => cap,
                    _ => discount,
                }
            }
            CouponKind::Fixed => self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon not found")]
    NotFound,
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon has expired or is not yet valid")]
    Expired,
    #[error("coupon usage limit reached")]
    LimitReached,
    #[error("minimum order amount is {min_order}")]
    MinOrderNotMet { min_order: Decimal },
}

impl CouponRejection {
    /// Stable machine-readable reason, used in API error bodies.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            CouponRejection::NotFound => "not_found",
            CouponRejection::Inactive => "inactive",
            CouponRejection::Expired => "expired",
            CouponRejection::LimitReached => "limit_reached",
            CouponRejection::MinOrderNotMet { .. } => "min_order_not_met",
        }
    }
}

/// Canonical form of a user-entered code: trimmed and uppercased.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validate `coupon` (the result of looking up a code) against an order total
/// at time `now` and return the discount it grants.
///
/// Checks run in a fixed order and stop at the first failure. The returned
/// discount never exceeds `order_total` and is rounded to cents.
///
/// # Errors
///
/// Returns the first [`CouponRejection`] that applies.
pub fn validate(
    coupon: Option<&Coupon>,
    order_total: Decimal,
    now: DateTime<Utc>,
) -> Result<Decimal, CouponRejection> {
    let coupon = coupon.ok_or(CouponRejection::NotFound)?;

    if !coupon.active {
        return Err(CouponRejection::Inactive);
    }
    if !coupon.is_within_window(now) {
        return Err(CouponRejection::Expired);
    }
    if coupon.is_exhausted() {
        return Err(CouponRejection::LimitReached);
    }
    if let Some(min_order) = coupon.min_order_amount {
        if order_total < min_order {
            return Err(CouponRejection::MinOrderNotMet { min_order });
        }
    }

    let discount = coupon.raw_discount(order_total).min(order_total);
    Ok(round_money(discount.max(Decimal::ZERO)))
}

/// A coupon definition submitted by an administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub description: Option<String>,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NewCoupon {
    /// Check the definition and return it with its code normalized.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] describing the first invalid field.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        self.code = normalize_code(&self.code);
        if self.code.is_empty() || self.code.len() > MAX_CODE_LEN {
            return Err(CoreError::Validation(format!(
                "code must be 1-{MAX_CODE_LEN} characters"
            )));
        }
        if !self
            .code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::Validation(
                "code may only contain letters, digits, '-' and '_'".to_string(),
            ));
        }
        if self.value <= Decimal::ZERO {
            return Err(CoreError::Validation("value must be positive".to_string()));
        }
        if self.kind == CouponKind::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(CoreError::Validation(
                "percentage value must not exceed 100".to_string(),
            ));
        }
        if self.kind == CouponKind::Fixed && self.max_discount_amount.is_some() {
            return Err(CoreError::Validation(
                "max_discount_amount only applies to percentage coupons".to_string(),
            ));
        }
        for (field, amount) in [
            ("min_order_amount", self.min_order_amount),
            ("max_discount_amount", self.max_discount_amount),
        ] {
            if matches!(amount, Some(a) if a <= Decimal::ZERO) {
                return Err(CoreError::Validation(format!("{field} must be positive")));
            }
        }
        if matches!(self.usage_limit, Some(limit) if limit < 0) {
            return Err(CoreError::Validation(
                "usage_limit must not be negative".to_string(),
            ));
        }
        if self.start_date > self.end_date {
            return Err(CoreError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(self)
    }
}

#[cfg(test)]
#[path = "coupons_test.rs"]
mod tests;
