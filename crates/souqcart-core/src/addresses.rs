//! Shipping address input rules and the snapshot copied onto orders.

use serde::{Deserialize, Serialize};

use crate::CoreError;

const DEFAULT_LABEL: &str = "Home";
const MAX_FIELD_LEN: usize = 200;

/// Address fields as submitted by a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub label: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub zip_code: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// Trim every field, fill in the default label and check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first blank or oversized
    /// field.
    pub fn normalized(self) -> Result<Self, CoreError> {
        let required = |field: &str, value: String| -> Result<String, CoreError> {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(CoreError::Validation(format!("{field} is required")));
            }
            if value.len() > MAX_FIELD_LEN {
                return Err(CoreError::Validation(format!(
                    "{field} must be at most {MAX_FIELD_LEN} characters"
                )));
            }
            Ok(value)
        };
        let optional = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            label: Some(optional(self.label).unwrap_or_else(|| DEFAULT_LABEL.to_string())),
            full_name: required("full_name", self.full_name)?,
            phone: optional(self.phone),
            street: required("street", self.street)?,
            city: required("city", self.city)?,
            state: optional(self.state),
            country: required("country", self.country)?,
            zip_code: optional(self.zip_code),
            is_default: self.is_default,
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            zip_code: self.zip_code.clone(),
        }
    }
}

/// Address frozen onto an order at checkout. Later edits to the customer's
/// saved address do not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub full_name: String,
    pub phone: Option<String>,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub zip_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AddressInput {
        AddressInput {
            label: None,
            full_name: " Layla Haddad ".to_string(),
            phone: Some("   ".to_string()),
            street: "12 King Fahd Rd".to_string(),
            city: "Riyadh".to_string(),
            state: None,
            country: "SA".to_string(),
            zip_code: Some("12211".to_string()),
            is_default: true,
        }
    }

    #[test]
    fn normalized_trims_and_defaults_label() {
        let a = input().normalized().expect("valid");
        assert_eq!(a.label.as_deref(), Some("Home"));
        assert_eq!(a.full_name, "Layla Haddad");
        assert!(a.phone.is_none());
        assert!(a.is_default);
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let mut a = input();
        a.city = "  ".to_string();
        assert_eq!(
            a.normalized(),
            Err(CoreError::Validation("city is required".to_string()))
        );
    }

    #[test]
    fn snapshot_copies_delivery_fields() {
        let a = input().normalized().expect("valid");
        let snap = a.snapshot();
        assert_eq!(snap.street, "12 King Fahd Rd");
        assert_eq!(snap.zip_code.as_deref(), Some("12211"));
    }
}
