//! Session-scoped wishlist store.
//!
//! Like [`crate::Cart`], a [`Wishlist`] is a plain value owned by the
//! session holder. Entries are unique per product and keep insertion order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishlist {
    items: Vec<WishlistItem>,
}

impl Wishlist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, product_id: Uuid) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    /// Add `item` unless its product is already saved. Returns whether the
    /// wishlist changed.
    pub fn add(&mut self, item: WishlistItem) -> bool {
        if self.contains(item.product_id) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    /// Heart-button semantics: remove when present, add otherwise. Returns
    /// true when the product is saved afterwards.
    pub fn toggle(&mut self, item: WishlistItem) -> bool {
        if self.remove(item.product_id) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore a wishlist saved with [`Wishlist::to_json`], dropping
    /// duplicate products (first occurrence wins).
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a serialized wishlist.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let stored: Self = serde_json::from_str(json)?;
        let mut wishlist = Self::new();
        for item in stored.items {
            wishlist.add(item);
        }
        Ok(wishlist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: Uuid) -> WishlistItem {
        WishlistItem {
            product_id,
            vendor_id: Uuid::nil(),
            name: "Oud oil 12ml".to_string(),
            price: "45.00".parse().expect("decimal"),
        }
    }

    #[test]
    fn add_ignores_products_already_saved() {
        let id = Uuid::new_v4();
        let mut wishlist = Wishlist::new();
        assert!(wishlist.add(item(id)));
        assert!(!wishlist.add(item(id)));
        assert_eq!(wishlist.len(), 1);
        assert!(wishlist.contains(id));
    }

    #[test]
    fn toggle_flips_membership() {
        let id = Uuid::new_v4();
        let mut wishlist = Wishlist::new();
        assert!(wishlist.toggle(item(id)));
        assert!(wishlist.contains(id));
        assert!(!wishlist.toggle(item(id)));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn remove_reports_whether_anything_changed() {
        let a = Uuid::new_v4();
        let mut wishlist = Wishlist::new();
        wishlist.add(item(a));
        wishlist.add(item(Uuid::new_v4()));

        assert!(wishlist.remove(a));
        assert!(!wishlist.remove(a));
        assert_eq!(wishlist.len(), 1);
        wishlist.clear();
        assert!(wishlist.is_empty());
    }

    #[test]
    fn restore_keeps_order_and_drops_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut wishlist = Wishlist::new();
        wishlist.add(item(a));
        wishlist.add(item(b));
        let restored = Wishlist::from_json(&wishlist.to_json().expect("json")).expect("restore");
        assert_eq!(restored, wishlist);

        let doubled = format!(
            r#"{{"items":[
                {{"product_id":"{a}","vendor_id":"{nil}","name":"x","price":"1.00"}},
                {{"product_id":"{a}","vendor_id":"{nil}","name":"y","price":"2.00"}}
            ]}}"#,
            nil = Uuid::nil()
        );
        let restored = Wishlist::from_json(&doubled).expect("restore");
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.items()[0].name, "x");
    }
}
