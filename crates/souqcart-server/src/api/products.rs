use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souqcart_core::{Role, Viewer};
use souqcart_db::{NewProduct, ProductRow, ProductUpdate};

use crate::middleware::{RequestId, RequireSession};

use super::{forbidden, map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ProductItem {
    id: Uuid,
    vendor_id: Uuid,
    name: String,
    price: Decimal,
    stock: i32,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductItem {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            vendor_id: row.vendor_id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub vendor_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductRequest {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update; omitted fields keep their stored values.
#[derive(Debug, Deserialize)]
pub(super) struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub active: Option<bool>,
}

fn validate_name(rid: &str, name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 200 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must be 1-200 characters",
        ));
    }
    Ok(name.to_owned())
}

fn validate_price(rid: &str, price: Decimal) -> Result<Decimal, ApiError> {
    if price <= Decimal::ZERO || price.normalize().scale() > 2 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "price must be positive with at most 2 decimal places",
        ));
    }
    Ok(price)
}

fn validate_stock(rid: &str, stock: i32) -> Result<i32, ApiError> {
    if stock < 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "stock must not be negative",
        ));
    }
    Ok(stock)
}

/// The caller's approved store, or `forbidden`.
fn own_store(rid: &str, viewer: &Viewer) -> Result<Uuid, ApiError> {
    match (viewer.role, viewer.vendor_id) {
        (Role::Vendor, Some(vendor_id)) => Ok(vendor_id),
        _ => Err(forbidden(rid)),
    }
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let rows = souqcart_db::list_active_products(&state.pool, query.vendor_id, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ProductItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// POST /api/v1/products — a vendor lists a product in their own store.
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductItem>>), ApiError> {
    let rid = &req_id.0;

    let vendor_id = own_store(rid, &viewer)?;
    let name = validate_name(rid, &body.name)?;
    let price = validate_price(rid, body.price)?;
    let stock = validate_stock(rid, body.stock)?;

    let row = souqcart_db::create_product(
        &state.pool,
        vendor_id,
        &NewProduct {
            name,
            price,
            stock,
            active: body.active,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(product_id = %row.id, vendor_id = %vendor_id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ProductItem::from(row), req_id.0)),
    ))
}

/// PUT /api/v1/products/{id} — the owning vendor edits a listing.
///
/// Products of other stores answer `404`, the same as unknown ids.
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(product_id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let rid = &req_id.0;
    let vendor_id = own_store(rid, &viewer)?;

    let update = ProductUpdate {
        name: body.name.as_deref().map(|n| validate_name(rid, n)).transpose()?,
        price: body.price.map(|p| validate_price(rid, p)).transpose()?,
        stock: body.stock.map(|s| validate_stock(rid, s)).transpose()?,
        active: body.active,
    };

    let row = souqcart_db::update_product(&state.pool, vendor_id, product_id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(product_id = %row.id, vendor_id = %vendor_id, "product updated");
    Ok(Json(ApiResponse::new(ProductItem::from(row), req_id.0)))
}

/// DELETE /api/v1/products/{id} — soft delete: the listing is deactivated so
/// past order lines keep their product.
pub(super) async fn deactivate_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let rid = &req_id.0;
    let vendor_id = own_store(rid, &viewer)?;

    let row = souqcart_db::deactivate_product(&state.pool, vendor_id, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(product_id = %row.id, vendor_id = %vendor_id, "product deactivated");
    Ok(Json(ApiResponse::new(ProductItem::from(row), req_id.0)))
}
