//! Session-scoped cart store.
//!
//! A [`Cart`] is an explicit value owned by whoever holds the session. It
//! crosses the persistence boundary only through [`Cart::to_json`] and
//! [`Cart::from_json`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::{self, CartLine, PricingBreakdown, PricingError, ShippingMethod};
use crate::CoreError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `line`, merging it into an existing line for the same product
    /// and variant. The merged quantity is clamped to the stock reported by
    /// the newest line; the unit price of an existing line is kept.
    ///
    /// Returns the quantity now in the cart for that item.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a non-positive price or
    /// quantity, or when the item is out of stock.
    pub fn add(&mut self, line: CartLine) -> Result<u32, CoreError> {
        if line.unit_price <= Decimal::ZERO {
            return Err(CoreError::Validation("unit price must be positive".to_string()));
        }
        if line.quantity == 0 {
            return Err(CoreError::Validation("quantity must be positive".to_string()));
        }
        if line.stock_available == 0 {
            return Err(CoreError::Validation(format!("{} is out of stock", line.name)));
        }

        let variant = line.variant_label.clone();
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.same_item(line.product_id, variant.as_deref()))
        {
            existing.stock_available = line.stock_available;
            existing.quantity = existing
                .quantity
                .saturating_add(line.quantity)
                .min(line.stock_available);
            return Ok(existing.quantity);
        }

        let quantity = line.quantity.min(line.stock_available);
        self.lines.push(CartLine { quantity, ..line });
        Ok(quantity)
    }

    /// Set the quantity of an item. Zero or less removes it; anything above
    /// stock is clamped. Returns false when the item is not in the cart.
    pub fn update_quantity(
        &mut self,
        product_id: Uuid,
        variant_label: Option<&str>,
        quantity: i64,
    ) -> bool {
        if quantity <= 0 {
            return self.remove(product_id, variant_label);
        }
        match self
            .lines
            .iter_mut()
            .find(|l| l.same_item(product_id, variant_label))
        {
            Some(line) => {
                let wanted = u32::try_from(quantity).unwrap_or(u32::MAX);
                line.quantity = wanted.min(line.stock_available);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, product_id: Uuid, variant_label: Option<&str>) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|l| !l.same_item(product_id, variant_label));
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        pricing::subtotal(&self.lines)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Price the cart.
    ///
    /// # Errors
    ///
    /// Propagates [`PricingError`] from [`pricing::calculate`].
    pub fn quote(
        &self,
        method: ShippingMethod,
        discount: Option<Decimal>,
    ) -> Result<PricingBreakdown, PricingError> {
        pricing::calculate(&self.lines, method, discount)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore a cart saved with [`Cart::to_json`].
    ///
    /// Lines that could no longer be added (zero quantity or stock) are
    /// dropped and quantities are clamped to the stored stock.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a serialized cart.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let stored: Self = serde_json::from_str(json)?;
        let lines = stored
            .lines
            .into_iter()
            .filter(|l| l.quantity > 0 && l.stock_available > 0 && l.unit_price > Decimal::ZERO)
            .map(|l| CartLine {
                quantity: l.quantity.min(l.stock_available),
                ..l
            })
            .collect();
        Ok(Self { lines })
    }
}
