//! Checkout and payment gateway callbacks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souqcart_core::{
    generate_order_number, pricing, AddressInput, AddressSnapshot, CartLine, OrderState,
    OrderStatus, PaymentMethod, PricingBreakdown, ShippingMethod, Transition, Viewer,
};
use souqcart_db::{DbError, NewOrder, OrderRow};
use souqcart_payments::{
    line_items_for_order, webhook, CheckoutSession, CheckoutSessionRequest, EventKind,
    PaymentEvent, PaymentsError, StripeClient,
};

use crate::middleware::{RequestId, RequireSession};

use super::cart::{catalog_lines, LineRequest};
use super::coupons::apply_coupon;
use super::{map_db_error, map_pricing_error, ApiError, ApiResponse, AppState};

/// Attempts at generating an unused order number.
const ORDER_NUMBER_ATTEMPTS: usize = 3;
/// Attempts at applying a webhook transition when the order keeps changing
/// underneath it.
const WEBHOOK_TRANSITION_ATTEMPTS: usize = 3;
const MAX_NOTES_LEN: usize = 1000;
const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Deserialize)]
pub(super) struct CheckoutRequest {
    pub items: Vec<LineRequest>,
    /// A saved address of the caller. Takes precedence over `shipping_address`.
    pub address_id: Option<Uuid>,
    pub shipping_address: Option<AddressInput>,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
    /// Storefront locale used in the gateway redirect URLs.
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CheckoutResponse {
    order_id: Uuid,
    order_number: String,
    status: String,
    payment_status: String,
    pricing: PricingBreakdown,
    /// Hosted payment page; absent for cash on delivery.
    checkout_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(super) enum WebhookOutcome {
    Applied,
    AlreadyApplied,
    Rejected,
    UnknownOrder,
    Ignored,
}

#[derive(Debug, Serialize)]
pub(super) struct WebhookAck {
    received: bool,
    outcome: WebhookOutcome,
}

fn checkout_locale(rid: &str, raw: Option<&str>) -> Result<String, ApiError> {
    let locale = raw.map_or(DEFAULT_LOCALE, str::trim);
    let valid = (2..=10).contains(&locale.len())
        && locale
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-');
    if valid {
        Ok(locale.to_owned())
    } else {
        Err(ApiError::new(
            rid,
            "validation_error",
            format!("locale '{locale}' is not valid"),
        ))
    }
}

fn checkout_notes(rid: &str, raw: Option<String>) -> Result<Option<String>, ApiError> {
    let notes = raw
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty());
    if notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTES_LEN)
    {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("notes must be at most {MAX_NOTES_LEN} characters"),
        ));
    }
    Ok(notes)
}

async fn shipping_snapshot(
    state: &AppState,
    rid: &str,
    viewer: &Viewer,
    address_id: Option<Uuid>,
    inline: Option<AddressInput>,
) -> Result<AddressSnapshot, ApiError> {
    if let Some(id) = address_id {
        let not_found = || ApiError::new(rid, "not_found", "address not found");
        let row = match souqcart_db::get_address(&state.pool, id).await {
            Ok(row) => row,
            Err(DbError::NotFound) => return Err(not_found()),
            Err(e) => return Err(map_db_error(rid.to_owned(), &e)),
        };
        if row.user_id != viewer.user_id {
            return Err(not_found());
        }
        return Ok(row.snapshot());
    }

    let input = inline.ok_or_else(|| {
        ApiError::new(
            rid,
            "validation_error",
            "address_id or shipping_address is required",
        )
    })?;
    input
        .normalized()
        .map(|address| address.snapshot())
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))
}

/// Insert the order, regenerating the order number on a collision.
async fn insert_order(
    state: &AppState,
    rid: &str,
    mut order: NewOrder,
) -> Result<OrderRow, ApiError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        order.order_number = generate_order_number();
        match souqcart_db::create_order(&state.pool, &order).await {
            Ok((row, _items)) => return Ok(row),
            Err(DbError::DuplicateOrderNumber(number)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                tracing::warn!(
                    order_number = %number,
                    attempt,
                    "order number collision; regenerating"
                );
            }
            Err(e) => return Err(map_db_error(rid.to_owned(), &e)),
        }
    }
}

async fn open_gateway_session(
    payments: &StripeClient,
    state: &AppState,
    order: &OrderRow,
    lines: &[CartLine],
    pricing: &PricingBreakdown,
    locale: &str,
) -> Result<CheckoutSession, PaymentsError> {
    let base = state.config.public_base_url.trim_end_matches('/');
    let request = CheckoutSessionRequest {
        order_id: order.id,
        order_number: order.order_number.clone(),
        currency: state.config.currency.clone(),
        line_items: line_items_for_order(&order.order_number, lines, pricing)?,
        success_url: format!("{base}/{locale}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{base}/{locale}/cart"),
    };
    payments.create_checkout_session(&request).await
}

/// Cancel an order whose payment could not be started, releasing its stock
/// and coupon use.
async fn release_order(state: &AppState, order: &OrderRow) {
    let Ok(current) = order.state() else {
        return;
    };
    if let Ok(Transition::Applied(next)) = current.cancel() {
        if let Err(e) = souqcart_db::cancel_order(&state.pool, order.id, current, next).await {
            tracing::error!(order_id = %order.id, error = %e, "failed to release unpaid order");
        }
    }
}

/// POST /api/v1/checkout — turn a cart into an order.
///
/// Prices are re-read from the catalog and the coupon is re-validated, so the
/// client cannot influence the amounts. Card orders get a hosted gateway
/// session and answer `200`; cash-on-delivery orders are confirmed
/// immediately and answer `201`.
pub(super) async fn create_checkout(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutResponse>>), ApiError> {
    let rid = &req_id.0;

    let locale = checkout_locale(rid, body.locale.as_deref())?;
    let notes = checkout_notes(rid, body.notes)?;
    let payments = match body.payment_method {
        PaymentMethod::Stripe => Some(state.payments.as_ref().ok_or_else(|| {
            tracing::error!("card checkout requested but no payment gateway is configured");
            ApiError::new(rid, "upstream_failure", "card payments are unavailable")
        })?),
        PaymentMethod::Cod => None,
    };

    let shipping_address = shipping_snapshot(
        &state,
        rid,
        &viewer,
        body.address_id,
        body.shipping_address,
    )
    .await?;

    let lines = catalog_lines(&state, rid, &body.items).await?;
    let undiscounted = pricing::calculate(&lines, body.shipping_method, None)
        .map_err(|e| map_pricing_error(rid.clone(), &e))?;

    let coupon = match body.coupon_code.as_deref() {
        Some(code) => Some(apply_coupon(&state, rid, code, undiscounted.subtotal).await?),
        None => None,
    };
    let pricing = pricing::calculate(
        &lines,
        body.shipping_method,
        coupon.as_ref().map(|c| c.discount),
    )
    .map_err(|e| map_pricing_error(rid.clone(), &e))?;

    let order = insert_order(
        &state,
        rid,
        NewOrder {
            order_number: String::new(),
            user_id: viewer.user_id,
            coupon_id: coupon
                .as_ref()
                .filter(|c| c.discount > Decimal::ZERO)
                .map(|c| c.coupon_id),
            pricing,
            state: OrderState::initial(body.payment_method),
            payment_method: body.payment_method,
            shipping_method: body.shipping_method,
            shipping_address,
            notes,
            lines: lines.clone(),
        },
    )
    .await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        user_id = %viewer.user_id,
        payment_method = body.payment_method.as_str(),
        total = %order.total,
        "order created"
    );

    let mut response = CheckoutResponse {
        order_id: order.id,
        order_number: order.order_number.clone(),
        status: order.status.clone(),
        payment_status: order.payment_status.clone(),
        pricing,
        checkout_url: None,
    };

    let Some(payments) = payments else {
        return Ok((
            StatusCode::CREATED,
            Json(ApiResponse::new(response, req_id.0)),
        ));
    };

    let session =
        match open_gateway_session(payments, &state, &order, &lines, &pricing, &locale).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(
                    order_id = %order.id,
                    error = %e,
                    "gateway session creation failed"
                );
                release_order(&state, &order).await;
                return Err(ApiError::new(
                    rid,
                    "upstream_failure",
                    "payment gateway is unavailable; please try again",
                ));
            }
        };

    souqcart_db::set_gateway_session(&state.pool, order.id, &session.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    response.checkout_url = session.url;
    Ok((StatusCode::OK, Json(ApiResponse::new(response, req_id.0))))
}

/// Find the order a gateway event refers to: by metadata id first, then by
/// the checkout session id recorded at checkout.
async fn order_for_event(
    state: &AppState,
    event: &PaymentEvent,
) -> Result<Option<OrderRow>, DbError> {
    if let Some(order_id) = event.order_id {
        match souqcart_db::get_order(&state.pool, order_id).await {
            Ok(order) => return Ok(Some(order)),
            Err(DbError::NotFound) => {}
            Err(e) => return Err(e),
        }
    }
    let Some(session_id) = event.session_id.as_deref() else {
        return Ok(None);
    };
    match souqcart_db::get_order_by_gateway_session(&state.pool, session_id).await {
        Ok(order) => Ok(Some(order)),
        Err(DbError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Apply a checkout completion or expiry to its order.
///
/// Re-deliveries land on [`Transition::Unchanged`] and change nothing.
///
/// A completion for an order that was cancelled first is still recorded,
/// leaving it CANCELLED/PAID. Its stock and coupon use were already released
/// by the cancellation, so nothing is re-reserved; such orders are logged
/// at warn level and need a manual refund.
async fn settle_payment(state: &AppState, event: &PaymentEvent) -> Result<WebhookOutcome, DbError> {
    let completed = match event.kind {
        EventKind::CheckoutCompleted => true,
        EventKind::CheckoutExpired => false,
        EventKind::Other(ref kind) => {
            tracing::debug!(event_id = %event.id, kind = %kind, "ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        }
    };

    let Some(mut order) = order_for_event(state, event).await? else {
        tracing::warn!(
            event_id = %event.id,
            session_id = ?event.session_id,
            "webhook event does not match any order"
        );
        return Ok(WebhookOutcome::UnknownOrder);
    };

    for _ in 0..WEBHOOK_TRANSITION_ATTEMPTS {
        let current = order.state()?;
        let step = if completed {
            current.payment_succeeded()
        } else {
            Ok(current.payment_failed())
        };

        let next = match step {
            Ok(Transition::Applied(next)) => next,
            Ok(Transition::Unchanged) => {
                tracing::info!(
                    event_id = %event.id,
                    order_id = %order.id,
                    "webhook already applied"
                );
                return Ok(WebhookOutcome::AlreadyApplied);
            }
            Err(e) => {
                tracing::warn!(
                    event_id = %event.id,
                    order_id = %order.id,
                    error = %e,
                    "webhook transition rejected"
                );
                return Ok(WebhookOutcome::Rejected);
            }
        };
        if completed && next.status == OrderStatus::Cancelled {
            tracing::warn!(order_id = %order.id, "payment captured for a cancelled order");
        }

        let payment_id = if completed {
            event.payment_intent.as_deref()
        } else {
            None
        };
        match souqcart_db::transition_order(&state.pool, order.id, current, next, payment_id).await
        {
            Ok(updated) => {
                tracing::info!(
                    event_id = %event.id,
                    order_id = %updated.id,
                    status = %updated.status,
                    payment_status = %updated.payment_status,
                    "payment status updated"
                );
                return Ok(WebhookOutcome::Applied);
            }
            Err(DbError::StaleOrderState { .. }) => {
                order = souqcart_db::get_order(&state.pool, order.id).await?;
            }
            Err(e) => return Err(e),
        }
    }

    Err(DbError::StaleOrderState {
        order_id: order.id,
        expected: order.status,
    })
}

/// POST /api/v1/checkout/webhook — signed gateway callbacks.
///
/// A bad signature answers `400` without touching any order. Unknown event
/// types and events for unknown orders are acknowledged so the gateway does
/// not keep redelivering them.
pub(super) async fn payment_webhook(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookAck>>, ApiError> {
    let rid = &req_id.0;

    let Some(secret) = state.config.stripe_webhook_secret.as_deref() else {
        tracing::error!("webhook received but no webhook secret is configured");
        return Err(ApiError::new(
            rid,
            "internal_error",
            "webhooks are not configured",
        ));
    };

    let signature = headers
        .get(webhook::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let event = webhook::construct_event(&body, signature, secret, Utc::now().timestamp())
        .map_err(|e| {
            tracing::warn!(error = %e, "rejected webhook delivery");
            ApiError::new(rid, "validation_error", format!("invalid webhook: {e}"))
        })?;

    let outcome = settle_payment(&state, &event)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        WebhookAck {
            received: true,
            outcome,
        },
        req_id.0,
    )))
}
