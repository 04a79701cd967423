//! HTTP client for a Stripe-compatible checkout API.
//!
//! Only hosted checkout sessions are needed: the storefront redirects the
//! customer to the session URL and learns the outcome from webhooks.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::PaymentsError;
use crate::types::{CheckoutSession, CheckoutSessionRequest, ErrorEnvelope};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com/";

/// Client for the gateway REST API.
///
/// Use [`StripeClient::new`] for production or
/// [`StripeClient::with_base_url`] to point at a mock server in tests.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: Url,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url.as_str())
            .field("secret_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// # Errors
    ///
    /// Returns [`PaymentsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(secret_key: &str, timeout_secs: u64) -> Result<Self, PaymentsError> {
        Self::with_base_url(secret_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PaymentsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PaymentsError::InvalidRequest`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        secret_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, PaymentsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("souqcart/0.1")
            .build()?;

        // Exactly one trailing slash so `join("v1/...")` appends instead of
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            PaymentsError::InvalidRequest(format!("invalid base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client,
            secret_key: secret_key.to_owned(),
            base_url,
        })
    }

    /// Create a hosted checkout session for an order.
    ///
    /// The order id travels as `metadata[order_id]` and
    /// `client_reference_id` so webhook events can be matched back, and as
    /// the idempotency key so a retried request cannot open two sessions.
    ///
    /// # Errors
    ///
    /// - [`PaymentsError::Api`] if the gateway rejects the request.
    /// - [`PaymentsError::Http`] on network failure.
    /// - [`PaymentsError::Deserialize`] if the response is not a session.
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentsError> {
        if request.line_items.is_empty() {
            return Err(PaymentsError::InvalidRequest(
                "checkout session needs at least one line item".to_string(),
            ));
        }

        let url = self
            .base_url
            .join("v1/checkout/sessions")
            .map_err(|e| PaymentsError::InvalidRequest(e.to_string()))?;
        let form = Self::session_form(request);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", request.order_id.to_string())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("unexpected response: {body}"));
            tracing::warn!(
                status = status.as_u16(),
                order_id = %request.order_id,
                message = %message,
                "checkout session creation rejected"
            );
            return Err(PaymentsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession =
            serde_json::from_str(&body).map_err(|e| PaymentsError::Deserialize {
                context: format!("checkout session for order {}", request.order_number),
                source: e,
            })?;
        tracing::info!(
            order_id = %request.order_id,
            session_id = %session.id,
            "checkout session created"
        );
        Ok(session)
    }

    /// Flatten a request into the gateway's bracketed form encoding.
    fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let order_id = request.order_id.to_string();
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), order_id.clone()),
            ("metadata[order_id]".to_string(), order_id),
            (
                "metadata[order_number]".to_string(),
                request.order_number.clone(),
            ),
        ];
        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((
                format!("{prefix}[price_data][currency]"),
                request.currency.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckoutLineItem;
    use uuid::Uuid;

    fn request() -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            order_id: Uuid::nil(),
            order_number: "SC-LZ3K9Q2M-7XQ2".to_string(),
            currency: "usd".to_string(),
            line_items: vec![CheckoutLineItem {
                name: "Saffron 5g".to_string(),
                unit_amount: 2450,
                quantity: 2,
            }],
            success_url: "http://localhost:3000/en/checkout/success".to_string(),
            cancel_url: "http://localhost:3000/en/cart".to_string(),
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn session_form_flattens_line_items() {
        let form = StripeClient::session_form(&request());

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(
            value(&form, "metadata[order_id]"),
            Some("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(
            value(&form, "line_items[0][price_data][unit_amount]"),
            Some("2450")
        );
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            value(&form, "line_items[0][price_data][currency]"),
            Some("usd")
        );
    }

    #[test]
    fn base_url_is_normalised() {
        let client =
            StripeClient::with_base_url("sk_test", 5, "http://127.0.0.1:9999").expect("client");
        assert_eq!(client.base_url.as_str(), "http://127.0.0.1:9999/");
        assert!(!format!("{client:?}").contains("sk_test"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = StripeClient::with_base_url("sk_test", 5, "not a url").unwrap_err();
        assert!(matches!(err, PaymentsError::InvalidRequest(_)));
    }
}
