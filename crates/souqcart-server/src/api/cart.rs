//! Cart pricing against the live catalog.

use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souqcart_core::{Cart, CartLine, PricingBreakdown, ShippingMethod};

use crate::middleware::RequestId;

use super::coupons::{apply_coupon, AppliedCoupon};
use super::{map_db_error, map_pricing_error, ApiError, ApiResponse, AppState};

/// Upper bound on distinct lines in one cart or checkout.
const MAX_LINES: usize = 100;

/// A cart line as submitted by a client. Prices always come from the
/// catalog, never from the request.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct LineRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub variant_label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QuoteRequest {
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct QuoteResponse {
    lines: Vec<CartLine>,
    item_count: u32,
    pricing: PricingBreakdown,
    coupon: Option<AppliedCoupon>,
}

/// Look up every requested product and build cart lines from the catalog's
/// current name, price, vendor and stock.
pub(super) async fn catalog_lines(
    state: &AppState,
    rid: &str,
    items: &[LineRequest],
) -> Result<Vec<CartLine>, ApiError> {
    if items.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "cart is empty"));
    }
    if items.len() > MAX_LINES {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("a cart holds at most {MAX_LINES} lines"),
        ));
    }

    let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, _> = souqcart_db::get_products_by_ids(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    items
        .iter()
        .map(|item| {
            let product = products
                .get(&item.product_id)
                .filter(|p| p.active)
                .ok_or_else(|| {
                    ApiError::new(
                        rid,
                        "validation_error",
                        format!("product {} is not available", item.product_id),
                    )
                })?;
            Ok(CartLine {
                product_id: product.id,
                vendor_id: product.vendor_id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: item.quantity,
                variant_label: item
                    .variant_label
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(ToOwned::to_owned),
                stock_available: u32::try_from(product.stock).unwrap_or(0),
            })
        })
        .collect()
}

/// POST /api/v1/cart/quote — rebuild a cart from the catalog and price it.
///
/// Repeated items are merged and quantities above stock are clamped, so the
/// returned lines show what the customer can actually buy.
pub(super) async fn quote_cart(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<QuoteResponse>>, ApiError> {
    let rid = &req_id.0;

    let mut cart = Cart::new();
    for line in catalog_lines(&state, rid, &body.items).await? {
        cart.add(line)
            .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;
    }

    let coupon = match body.coupon_code.as_deref() {
        Some(code) => Some(apply_coupon(&state, rid, code, cart.subtotal()).await?),
        None => None,
    };
    let discount = coupon.as_ref().map(|c| c.discount).filter(|d| *d > Decimal::ZERO);

    let pricing = cart
        .quote(body.shipping_method, discount)
        .map_err(|e| map_pricing_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        QuoteResponse {
            item_count: cart.item_count(),
            lines: cart.lines().to_vec(),
            pricing,
            coupon,
        },
        req_id.0,
    )))
}
