use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souqcart_db::VendorRow;

use crate::middleware::{RequestId, RequireSession};

use super::{forbidden, map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct VendorItem {
    id: Uuid,
    user_id: Uuid,
    store_name: String,
    approved: bool,
    created_at: DateTime<Utc>,
}

impl From<VendorRow> for VendorItem {
    fn from(row: VendorRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            store_name: row.store_name,
            approved: row.approved,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct VendorQuery {
    pub approved: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApprovalRequest {
    pub approved: bool,
}

/// GET /api/v1/vendors — admins review stores, `?approved=false` for the
/// approval queue.
pub(super) async fn list_vendors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Query(query): Query<VendorQuery>,
) -> Result<Json<ApiResponse<Vec<VendorItem>>>, ApiError> {
    if !viewer.role.can_administer() {
        return Err(forbidden(&req_id.0));
    }

    let limit = normalize_limit(query.limit);
    let rows = souqcart_db::list_vendors(&state.pool, query.approved, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(VendorItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// PUT /api/v1/vendors/{id}/approval — approve or suspend a store.
pub(super) async fn set_vendor_approval(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(vendor_id): Path<Uuid>,
    Json(body): Json<ApprovalRequest>,
) -> Result<Json<ApiResponse<VendorItem>>, ApiError> {
    let rid = &req_id.0;
    if !viewer.role.can_administer() {
        return Err(forbidden(rid));
    }

    let row = souqcart_db::set_vendor_approval(&state.pool, vendor_id, body.approved)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(
        vendor_id = %row.id,
        admin_id = %viewer.user_id,
        approved = row.approved,
        "vendor approval changed"
    );
    Ok(Json(ApiResponse::new(VendorItem::from(row), req_id.0)))
}
