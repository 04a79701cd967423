use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souqcart_core::{Wishlist, WishlistItem};

use crate::middleware::{RequestId, RequireSession};

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct AddWishlistRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(super) struct RemovedData {
    product_id: Uuid,
    removed: bool,
}

/// GET /api/v1/wishlist — the caller's saved products, newest first.
/// Products taken off the catalog are left out.
pub(super) async fn list_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
) -> Result<Json<ApiResponse<Vec<WishlistItem>>>, ApiError> {
    let rows = souqcart_db::list_wishlist(&state.pool, viewer.user_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut wishlist = Wishlist::new();
    for row in rows.into_iter().filter(|r| r.active) {
        wishlist.add(row.into());
    }
    Ok(Json(ApiResponse::new(wishlist.items().to_vec(), req_id.0)))
}

/// POST /api/v1/wishlist — save an active product; saving it twice is a
/// `409`.
pub(super) async fn add_to_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Json(body): Json<AddWishlistRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WishlistItem>>), ApiError> {
    let rid = &req_id.0;

    let product = souqcart_db::get_products_by_ids(&state.pool, &[body.product_id])
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .into_iter()
        .find(|p| p.active)
        .ok_or_else(|| ApiError::new(rid, "not_found", "product not found"))?;

    let added = souqcart_db::add_to_wishlist(&state.pool, viewer.user_id, product.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !added {
        return Err(ApiError::new(rid, "conflict", "product already in wishlist"));
    }

    tracing::debug!(user_id = %viewer.user_id, product_id = %product.id, "wishlist item added");
    let item = WishlistItem {
        product_id: product.id,
        vendor_id: product.vendor_id,
        name: product.name,
        price: product.price,
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::new(item, req_id.0))))
}

/// DELETE /api/v1/wishlist/{product_id}
pub(super) async fn remove_from_wishlist(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RemovedData>>, ApiError> {
    souqcart_db::remove_from_wishlist(&state.pool, viewer.user_id, product_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        RemovedData {
            product_id,
            removed: true,
        },
        req_id.0,
    )))
}
