//! Saved shipping addresses of the signed-in user.
//!
//! Addresses of other users are reported as not found rather than
//! forbidden, so ids cannot be enumerated.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use souqcart_core::AddressInput;
use souqcart_db::{AddressRow, DbError};

use crate::middleware::{RequestId, RequireSession};

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct AddressItem {
    id: Uuid,
    label: String,
    full_name: String,
    phone: Option<String>,
    street: String,
    city: String,
    state: Option<String>,
    country: String,
    zip_code: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AddressRow> for AddressItem {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            label: row.label,
            full_name: row.full_name,
            phone: row.phone,
            street: row.street,
            city: row.city,
            state: row.state,
            country: row.country,
            zip_code: row.zip_code,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct Deleted {
    id: Uuid,
    deleted: bool,
}

fn validated(rid: &str, input: AddressInput) -> Result<AddressInput, ApiError> {
    input
        .normalized()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))
}

fn map_address_error(rid: &str, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(rid, "not_found", "address not found"),
        other => map_db_error(rid.to_owned(), other),
    }
}

/// GET /api/v1/addresses — default first.
pub(super) async fn list_addresses(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
) -> Result<Json<ApiResponse<Vec<AddressItem>>>, ApiError> {
    let rows = souqcart_db::list_addresses(&state.pool, viewer.user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(AddressItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// POST /api/v1/addresses
pub(super) async fn create_address(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Json(body): Json<AddressInput>,
) -> Result<(StatusCode, Json<ApiResponse<AddressItem>>), ApiError> {
    let rid = &req_id.0;
    let input = validated(rid, body)?;

    let row = souqcart_db::create_address(&state.pool, viewer.user_id, &input)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(AddressItem::from(row), req_id.0)),
    ))
}

/// PUT /api/v1/addresses/{id}
pub(super) async fn update_address(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(address_id): Path<Uuid>,
    Json(body): Json<AddressInput>,
) -> Result<Json<ApiResponse<AddressItem>>, ApiError> {
    let rid = &req_id.0;
    let input = validated(rid, body)?;

    let row = souqcart_db::update_address(&state.pool, viewer.user_id, address_id, &input)
        .await
        .map_err(|e| map_address_error(rid, &e))?;

    Ok(Json(ApiResponse::new(AddressItem::from(row), req_id.0)))
}

/// DELETE /api/v1/addresses/{id}
pub(super) async fn delete_address(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(address_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    souqcart_db::delete_address(&state.pool, viewer.user_id, address_id)
        .await
        .map_err(|e| map_address_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse::new(
        Deleted {
            id: address_id,
            deleted: true,
        },
        req_id.0,
    )))
}

/// POST /api/v1/addresses/{id}/default
pub(super) async fn set_default_address(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(address_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AddressItem>>, ApiError> {
    let row = souqcart_db::set_default_address(&state.pool, viewer.user_id, address_id)
        .await
        .map_err(|e| map_address_error(&req_id.0, &e))?;

    tracing::info!(address_id = %row.id, user_id = %viewer.user_id, "default address changed");
    Ok(Json(ApiResponse::new(AddressItem::from(row), req_id.0)))
}
