use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souqcart_core::{coupons, CouponKind, NewCoupon};
use souqcart_db::CouponRow;

use crate::middleware::{RequestId, RequireSession};

use super::{
    forbidden, map_coupon_rejection, map_db_error, normalize_limit, ApiError, ApiResponse,
    AppState,
};

#[derive(Debug, Clone, Serialize)]
pub(super) struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub discount: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct CouponItem {
    id: Uuid,
    code: String,
    description: Option<String>,
    kind: String,
    value: Decimal,
    min_order_amount: Option<Decimal>,
    max_discount_amount: Option<Decimal>,
    usage_limit: Option<i32>,
    used_count: i32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    active: bool,
}

impl From<CouponRow> for CouponItem {
    fn from(row: CouponRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            description: row.description,
            kind: row.kind,
            value: row.value,
            min_order_amount: row.min_order_amount,
            max_discount_amount: row.max_discount_amount,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            start_date: row.start_date,
            end_date: row.end_date,
            active: row.active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ValidateCouponRequest {
    pub code: String,
    pub order_total: Decimal,
}

#[derive(Debug, Deserialize)]
pub(super) struct CouponListQuery {
    pub limit: Option<i64>,
}

/// Look up `code` and validate it against `order_total` without consuming
/// a use.
pub(super) async fn apply_coupon(
    state: &AppState,
    rid: &str,
    code: &str,
    order_total: Decimal,
) -> Result<AppliedCoupon, ApiError> {
    let row = souqcart_db::get_coupon_by_code(&state.pool, code)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?;
    let coupon = row
        .as_ref()
        .map(CouponRow::to_coupon)
        .transpose()
        .map_err(|e| map_db_error(rid.to_owned(), &e))?;

    let discount = coupons::validate(coupon.as_ref(), order_total, Utc::now()).map_err(|r| {
        tracing::debug!(
            code = %coupons::normalize_code(code),
            reason = r.reason(),
            "coupon rejected"
        );
        map_coupon_rejection(rid.to_owned(), &r)
    })?;

    // validate() only succeeds for Some.
    let coupon = coupon.ok_or_else(|| ApiError::new(rid, "not_found", "coupon not found"))?;
    Ok(AppliedCoupon {
        coupon_id: coupon.id,
        code: coupon.code,
        kind: coupon.kind,
        value: coupon.value,
        discount,
    })
}

/// POST /api/v1/coupons/validate
pub(super) async fn validate_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ValidateCouponRequest>,
) -> Result<Json<ApiResponse<AppliedCoupon>>, ApiError> {
    let rid = &req_id.0;

    if body.code.trim().is_empty() {
        return Err(ApiError::new(rid, "validation_error", "code is required"));
    }
    if body.order_total <= Decimal::ZERO {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "order_total must be positive",
        ));
    }

    let applied = apply_coupon(&state, rid, &body.code, body.order_total).await?;
    Ok(Json(ApiResponse::new(applied, req_id.0)))
}

/// GET /api/v1/coupons — admin only.
pub(super) async fn list_coupons(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Query(query): Query<CouponListQuery>,
) -> Result<Json<ApiResponse<Vec<CouponItem>>>, ApiError> {
    if !viewer.role.can_administer() {
        return Err(forbidden(&req_id.0));
    }

    let rows = souqcart_db::list_coupons(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(CouponItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// POST /api/v1/coupons — admin only.
pub(super) async fn create_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Json(body): Json<NewCoupon>,
) -> Result<(StatusCode, Json<ApiResponse<CouponItem>>), ApiError> {
    let rid = &req_id.0;
    if !viewer.role.can_administer() {
        return Err(forbidden(rid));
    }

    let coupon = body
        .validated()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let row = souqcart_db::create_coupon(&state.pool, &coupon)
        .await
        .map_err(|e| match e {
            souqcart_db::DbError::Conflict(_) => ApiError::new(
                rid,
                "conflict",
                format!("a coupon with code {} already exists", coupon.code),
            ),
            other => map_db_error(rid.clone(), &other),
        })?;

    tracing::info!(coupon_id = %row.id, code = %row.code, "coupon created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CouponItem::from(row), req_id.0)),
    ))
}
