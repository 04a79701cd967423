//! Cart pricing: subtotal, shipping, tax, discount and total.
//!
//! All amounts are [`Decimal`]. Each component is rounded to cents before the
//! total is derived from the rounded components, so
//! `total == subtotal + shipping_cost + tax - discount` holds exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::round_money;

/// Standard shipping is free at or above this subtotal.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(5000, 0, 0, false, 2);
/// Flat shipping fee for express orders and small standard orders.
pub const FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(999, 0, 0, false, 2);
/// Flat sales tax rate applied to the subtotal.
pub const TAX_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// One line of a cart, with the catalog price captured when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub variant_label: Option<String>,
    pub stock_available: u32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Returns true when this line and `other` refer to the same purchasable
    /// item (same product, same variant).
    #[must_use]
    pub fn same_item(&self, product_id: Uuid, variant_label: Option<&str>) -> bool {
        self.product_id == product_id && self.variant_label.as_deref() == variant_label
    }

    fn check(&self) -> Result<(), PricingError> {
        if self.unit_price <= Decimal::ZERO {
            return Err(PricingError::InvalidLine {
                product_id: self.product_id,
                reason: "unit price must be positive".to_string(),
            });
        }
        if self.quantity == 0 {
            return Err(PricingError::InvalidLine {
                product_id: self.product_id,
                reason: "quantity must be positive".to_string(),
            });
        }
        if self.quantity > self.stock_available {
            return Err(PricingError::InvalidLine {
                product_id: self.product_id,
                reason: format!(
                    "quantity {} exceeds available stock {}",
                    self.quantity, self.stock_available
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

impl ShippingMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ShippingMethod::Standard => "standard",
            ShippingMethod::Express => "express",
        }
    }
}

impl std::str::FromStr for ShippingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ShippingMethod::Standard),
            "express" => Ok(ShippingMethod::Express),
            other => Err(format!("unknown shipping method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingBreakdown {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("invalid cart line for product {product_id}: {reason}")]
    InvalidLine { product_id: Uuid, reason: String },
    #[error("discount must not be negative")]
    NegativeDiscount,
}

/// Exact sum of `unit_price * quantity`, unrounded.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

#[must_use]
pub fn shipping_cost(subtotal: Decimal, method: ShippingMethod) -> Decimal {
    match method {
        ShippingMethod::Standard if subtotal >= FREE_SHIPPING_THRESHOLD => Decimal::ZERO,
        ShippingMethod::Standard | ShippingMethod::Express => FLAT_SHIPPING_FEE,
    }
}

#[must_use]
pub fn tax(subtotal: Decimal) -> Decimal {
    round_money(subtotal * TAX_RATE)
}

/// Price a cart.
///
/// `discount` is the amount produced by coupon validation; it is capped at
/// the subtotal so the discount can never exceed the goods it applies to.
///
/// # Errors
///
/// Returns [`PricingError`] for an empty cart, a line with a non-positive
/// price or quantity, a quantity above available stock, or a negative
/// discount.
pub fn calculate(
    lines: &[CartLine],
    method: ShippingMethod,
    discount: Option<Decimal>,
) -> Result<PricingBreakdown, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::EmptyCart);
    }
    for line in lines {
        line.check()?;
    }

    let discount = discount.unwrap_or(Decimal::ZERO);
    if discount < Decimal::ZERO {
        return Err(PricingError::NegativeDiscount);
    }

    let subtotal = round_money(subtotal(lines));
    let shipping_cost = shipping_cost(subtotal, method);
    let tax = tax(subtotal);
    let discount = round_money(discount.min(subtotal));
    let total = subtotal + shipping_cost + tax - discount;

    Ok(PricingBreakdown {
        subtotal,
        shipping_cost,
        tax,
        discount,
        total,
    })
}
