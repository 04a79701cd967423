//! Who may see and change what.
//!
//! Handlers never branch on roles themselves: they build a [`Viewer`] from
//! the session, derive an [`OrderScope`], and hand the scope to the
//! persistence layer, which turns it into a `WHERE` predicate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        }
    }

    /// Vendors and admins move orders through fulfillment.
    #[must_use]
    pub fn can_manage_fulfillment(self) -> bool {
        matches!(self, Role::Vendor | Role::Admin)
    }

    /// Coupons, refunds and other store-wide operations.
    #[must_use]
    pub fn can_administer(self) -> bool {
        self == Role::Admin
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "vendor" => Ok(Role::Vendor),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: Uuid,
    pub role: Role,
    /// Set when the user owns a vendor store.
    pub vendor_id: Option<Uuid>,
}

/// Orders visible to a [`Viewer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Orders placed by this user.
    Own(Uuid),
    /// Orders containing at least one line sold by this vendor.
    Vendor(Uuid),
    /// A vendor-role user without a store sees no orders.
    Nothing,
    All,
}

impl OrderScope {
    #[must_use]
    pub fn for_viewer(viewer: &Viewer) -> Self {
        match (viewer.role, viewer.vendor_id) {
            (Role::Customer, _) => OrderScope::Own(viewer.user_id),
            (Role::Vendor, Some(vendor_id)) => OrderScope::Vendor(vendor_id),
            (Role::Vendor, None) => OrderScope::Nothing,
            (Role::Admin, _) => OrderScope::All,
        }
    }

    /// In-memory form of the same predicate, for a single loaded order.
    #[must_use]
    pub fn permits(&self, order_user_id: Uuid, line_vendor_ids: &[Uuid]) -> bool {
        match self {
            OrderScope::Own(user_id) => *user_id == order_user_id,
            OrderScope::Vendor(vendor_id) => line_vendor_ids.contains(vendor_id),
            OrderScope::Nothing => false,
            OrderScope::All => true,
        }
    }
}
