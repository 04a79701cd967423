//! Payment gateway integration: hosted checkout sessions and signed
//! webhook deliveries.

mod client;
mod error;
mod types;
pub mod webhook;

pub use client::StripeClient;
pub use error::{PaymentsError, WebhookError};
pub use types::{
    line_items_for_order, to_minor_units, CheckoutLineItem, CheckoutSession,
    CheckoutSessionRequest,
};
pub use webhook::{EventKind, PaymentEvent};
