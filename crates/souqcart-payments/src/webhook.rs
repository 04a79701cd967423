//! Webhook signature verification and event parsing.
//!
//! The gateway signs each delivery with
//! `Stripe-Signature: t=<unix seconds>,v1=<hex hmac-sha256(secret, "<t>.<payload>")>`.
//! A header may carry several `v1` entries during secret rotation; any one
//! matching is enough.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::WebhookError;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// What a delivery means for the order it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CheckoutCompleted,
    CheckoutExpired,
    /// Acknowledged and ignored.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub id: String,
    pub kind: EventKind,
    pub session_id: Option<String>,
    /// From `metadata.order_id`; `None` if absent or not a UUID.
    pub order_id: Option<Uuid>,
    pub payment_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    object: RawSession,
}

#[derive(Debug, Default, Deserialize)]
struct RawSession {
    id: Option<String>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
    payment_intent: Option<String>,
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::InvalidSecret(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Produce a signature header value for `payload`.
///
/// # Errors
///
/// Returns [`WebhookError::InvalidSecret`] if the secret cannot key an HMAC.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check a signature header against `payload`.
///
/// `now` is the current unix time in seconds.
///
/// # Errors
///
/// - [`WebhookError::MalformedHeader`] if `t` or every `v1` is missing or
///   unparseable.
/// - [`WebhookError::TimestampOutOfTolerance`] if `t` is further than
///   `tolerance_secs` from `now`.
/// - [`WebhookError::SignatureMismatch`] if no `v1` matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    WebhookError::MalformedHeader(format!("timestamp '{value}' is not a number"))
                })?);
            }
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    candidates.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| WebhookError::MalformedHeader("missing timestamp".to_string()))?;
    if candidates.is_empty() {
        return Err(WebhookError::MalformedHeader(
            "missing v1 signature".to_string(),
        ));
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::TimestampOutOfTolerance {
            timestamp,
            tolerance_secs,
        });
    }

    let expected = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    let matched = candidates
        .iter()
        .fold(subtle::Choice::from(0), |acc, candidate| {
            acc | expected.as_slice().ct_eq(candidate.as_slice())
        });
    if bool::from(matched) {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Parse a verified payload.
///
/// # Errors
///
/// Returns [`WebhookError::InvalidPayload`] if the body is not an event.
pub fn parse_event(payload: &[u8]) -> Result<PaymentEvent, WebhookError> {
    let raw: RawEvent = serde_json::from_slice(payload)?;
    let kind = match raw.event_type.as_str() {
        "checkout.session.completed" => EventKind::CheckoutCompleted,
        "checkout.session.expired" => EventKind::CheckoutExpired,
        other => EventKind::Other(other.to_string()),
    };
    let session = raw.data.object;
    let order_id = session
        .metadata
        .get("order_id")
        .and_then(|id| Uuid::parse_str(id).ok());

    Ok(PaymentEvent {
        id: raw.id,
        kind,
        session_id: session.id,
        order_id,
        payment_intent: session.payment_intent,
    })
}

/// Verify then parse a delivery.
///
/// # Errors
///
/// Any error from [`verify_signature`] or [`parse_event`].
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<PaymentEvent, WebhookError> {
    verify_signature(payload, header, secret, now, DEFAULT_TOLERANCE_SECS)?;
    parse_event(payload)
}

#[cfg(test)]
#[path = "webhook_test.rs"]
mod tests;
