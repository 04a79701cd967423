//! Domain logic for SouqCart: pricing, coupons, the order state machine,
//! order numbers, the cart and wishlist stores, access scopes, sales
//! summaries and configuration.
//!
//! Everything in this crate is synchronous and free of I/O apart from
//! reading environment variables in [`config`].

pub mod access;
pub mod addresses;
pub mod app_config;
pub mod cart;
pub mod config;
pub mod coupons;
pub mod order_number;
pub mod orders;
pub mod pricing;
pub mod sales;
pub mod wishlist;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

pub use access::{OrderScope, Role, Viewer};
pub use addresses::{AddressInput, AddressSnapshot};
pub use app_config::{AppConfig, Environment};
pub use cart::Cart;
pub use config::{load_app_config, load_app_config_from_env};
pub use coupons::{Coupon, CouponKind, CouponRejection, NewCoupon};
pub use order_number::generate_order_number;
pub use orders::{
    OrderState, OrderStatus, PaymentMethod, PaymentStatus, Transition, TransitionError,
};
pub use pricing::{CartLine, PricingBreakdown, PricingError, ShippingMethod};
pub use sales::{SalesGroup, SalesSummary, StatusCount};
pub use wishlist::{Wishlist, WishlistItem};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Round a monetary amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
