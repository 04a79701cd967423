//! Request and response shapes for hosted checkout sessions.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use souqcart_core::{CartLine, PricingBreakdown};

use crate::error::PaymentsError;

/// One priced line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    /// Price in the currency's minor unit (cents).
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub order_id: Uuid,
    pub order_number: String,
    /// Lowercase ISO 4217 code.
    pub currency: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page the customer is redirected to.
    pub url: Option<String>,
    pub payment_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: Option<String>,
}

/// Convert a 2dp amount into minor units.
///
/// # Errors
///
/// Returns [`PaymentsError::InvalidRequest`] for negative amounts or amounts
/// that do not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PaymentsError::InvalidRequest(format!(
            "amount {amount} is negative"
        )));
    }
    (souqcart_core::round_money(amount) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| PaymentsError::InvalidRequest(format!("amount {amount} is out of range")))
}

/// Build checkout line items that add up to the order total.
///
/// Products are listed individually with shipping and tax as extra lines.
/// The gateway does not accept negative lines, so a discounted order is
/// charged as a single line for its total.
///
/// # Errors
///
/// Returns [`PaymentsError::InvalidRequest`] if an amount cannot be expressed
/// in minor units.
pub fn line_items_for_order(
    order_number: &str,
    lines: &[CartLine],
    pricing: &PricingBreakdown,
) -> Result<Vec<CheckoutLineItem>, PaymentsError> {
    if pricing.discount > Decimal::ZERO {
        return Ok(vec![CheckoutLineItem {
            name: format!("Order {order_number}"),
            unit_amount: to_minor_units(pricing.total)?,
            quantity: 1,
        }]);
    }

    let mut items = lines
        .iter()
        .map(|line| {
            let name = match &line.variant_label {
                Some(variant) => format!("{} ({variant})", line.name),
                None => line.name.clone(),
            };
            Ok(CheckoutLineItem {
                name,
                unit_amount: to_minor_units(line.unit_price)?,
                quantity: line.quantity,
            })
        })
        .collect::<Result<Vec<_>, PaymentsError>>()?;

    for (name, amount) in [("Shipping", pricing.shipping_cost), ("Tax", pricing.tax)] {
        if amount > Decimal::ZERO {
            items.push(CheckoutLineItem {
                name: name.to_string(),
                unit_amount: to_minor_units(amount)?,
                quantity: 1,
            });
        }
    }
    Ok(items)
}
