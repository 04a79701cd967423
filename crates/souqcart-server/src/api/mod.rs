mod addresses;
mod analytics;
mod cart;
mod checkout;
mod coupons;
mod orders;
mod products;
mod vendors;
mod wishlist;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use souqcart_core::{AppConfig, CouponRejection, PricingError, TransitionError};
use souqcart_db::DbError;
use souqcart_payments::StripeClient;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// `None` when no gateway key is configured; card checkout is then refused.
    pub payments: Option<StripeClient>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn new(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(crate) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" | "invalid_transition" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

pub(crate) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(crate) fn forbidden(request_id: &str) -> ApiError {
    ApiError::new(request_id, "forbidden", "not allowed to access this resource")
}

pub(crate) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "resource not found"),
        DbError::StaleOrderState { order_id, .. } => {
            tracing::warn!(order_id = %order_id, "order changed concurrently");
            ApiError::new(
                request_id,
                "conflict",
                "order was modified concurrently; reload and retry",
            )
        }
        DbError::InsufficientStock { product_id } => ApiError::new(
            request_id,
            "conflict",
            format!("insufficient stock for product {product_id}"),
        ),
        DbError::CouponExhausted { .. } => ApiError::new(
            request_id,
            "validation_error",
            CouponRejection::LimitReached.to_string(),
        ),
        DbError::Conflict(constraint) => {
            tracing::warn!(constraint = %constraint, "unique constraint violated");
            ApiError::new(request_id, "conflict", "resource already exists")
        }
        other => {
            tracing::error!(error = %other, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(crate) fn map_transition_error(request_id: String, error: &TransitionError) -> ApiError {
    ApiError::new(request_id, "invalid_transition", error.to_string())
}

pub(crate) fn map_pricing_error(request_id: String, error: &PricingError) -> ApiError {
    ApiError::new(request_id, "validation_error", error.to_string())
}

pub(crate) fn map_coupon_rejection(request_id: String, rejection: &CouponRejection) -> ApiError {
    let code = match rejection {
        CouponRejection::NotFound => "not_found",
        _ => "validation_error",
    };
    ApiError::new(request_id, code, rejection.to_string())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/v1/products/{id}",
            put(products::update_product).delete(products::deactivate_product),
        )
        .route("/api/v1/cart/quote", post(cart::quote_cart))
        .route(
            "/api/v1/coupons",
            get(coupons::list_coupons).post(coupons::create_coupon),
        )
        .route("/api/v1/coupons/validate", post(coupons::validate_coupon))
        .route("/api/v1/checkout", post(checkout::create_checkout))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/{id}", get(orders::get_order))
        .route("/api/v1/orders/{id}/cancel", post(orders::cancel_order))
        .route("/api/v1/orders/{id}/status", put(orders::update_order_status))
        .route(
            "/api/v1/addresses",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route(
            "/api/v1/addresses/{id}",
            put(addresses::update_address).delete(addresses::delete_address),
        )
        .route(
            "/api/v1/addresses/{id}/default",
            post(addresses::set_default_address),
        )
        .route(
            "/api/v1/wishlist",
            get(wishlist::list_wishlist).post(wishlist::add_to_wishlist),
        )
        .route(
            "/api/v1/wishlist/{product_id}",
            delete(wishlist::remove_from_wishlist),
        )
        .route("/api/v1/vendors", get(vendors::list_vendors))
        .route(
            "/api/v1/vendors/{id}/approval",
            put(vendors::set_vendor_approval),
        )
        .route("/api/v1/analytics/admin", get(analytics::admin_analytics))
        .route("/api/v1/analytics/vendor", get(analytics::vendor_analytics))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

/// Assemble the full router.
///
/// Health checks and gateway webhooks bypass the rate limiter; everything
/// else shares one window. Per-route authentication is done by the
/// [`crate::middleware::RequireSession`] extractor.
pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/checkout/webhook", post(checkout::payment_webhook));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match souqcart_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::new(
                HealthData {
                    status: "ok",
                    database: "ok",
                },
                req_id.0,
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            let mut body = ApiResponse::new(
                HealthData {
                    status: "degraded",
                    database: "unavailable",
                },
                req_id.0,
            );
            body.success = false;
            (StatusCode::SERVICE_UNAVAILABLE, Json(body))
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
