use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use souqcart_core::{AddressSnapshot, OrderScope, OrderStatus, Transition, Viewer};
use souqcart_db::{DbError, OrderFilter, OrderItemRow, OrderRow};

use crate::middleware::{RequestId, RequireSession};

use super::{
    forbidden, map_db_error, map_transition_error, normalize_limit, ApiError, ApiResponse,
    AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct OrderSummary {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    status: String,
    payment_status: String,
    payment_method: String,
    shipping_method: String,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&OrderRow> for OrderSummary {
    fn from(row: &OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number.clone(),
            user_id: row.user_id,
            status: row.status.clone(),
            payment_status: row.payment_status.clone(),
            payment_method: row.payment_method.clone(),
            shipping_method: row.shipping_method.clone(),
            subtotal: row.subtotal,
            shipping_cost: row.shipping_cost,
            tax: row.tax,
            discount: row.discount,
            total: row.total,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OrderItem {
    product_id: Uuid,
    vendor_id: Uuid,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    variant_label: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_id: row.product_id,
            vendor_id: row.vendor_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            variant_label: row.variant_label,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OrderDetail {
    #[serde(flatten)]
    summary: OrderSummary,
    shipping_address: AddressSnapshot,
    notes: Option<String>,
    items: Vec<OrderItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct Pagination {
    page: i64,
    limit: i64,
    total: i64,
    total_pages: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderList {
    orders: Vec<OrderSummary>,
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Load an order the viewer is allowed to see.
///
/// Unknown ids are `404`; orders outside the viewer's scope are `403`.
async fn load_visible_order(
    state: &AppState,
    rid: &str,
    viewer: &Viewer,
    order_id: Uuid,
) -> Result<OrderRow, ApiError> {
    let order = match souqcart_db::get_order(&state.pool, order_id).await {
        Ok(order) => order,
        Err(DbError::NotFound) => {
            return Err(ApiError::new(rid, "not_found", "order not found"));
        }
        Err(e) => return Err(map_db_error(rid.to_owned(), &e)),
    };

    let scope = OrderScope::for_viewer(viewer);
    let vendor_ids = match scope {
        OrderScope::Vendor(_) => souqcart_db::order_vendor_ids(&state.pool, order_id)
            .await
            .map_err(|e| map_db_error(rid.to_owned(), &e))?,
        _ => Vec::new(),
    };
    if !scope.permits(order.user_id, &vendor_ids) {
        tracing::debug!(
            order_id = %order_id,
            user_id = %viewer.user_id,
            "order outside viewer scope"
        );
        return Err(forbidden(rid));
    }
    Ok(order)
}

/// GET /api/v1/orders — orders visible to the caller, newest first.
pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<OrderList>>, ApiError> {
    let rid = &req_id.0;

    let status = query
        .status
        .as_deref()
        .map(|s| s.trim().to_ascii_uppercase().parse::<OrderStatus>())
        .transpose()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;
    let filter = OrderFilter {
        status,
        page: query.page.unwrap_or(1).max(1),
        limit: normalize_limit(query.limit),
    };

    let page = souqcart_db::list_orders(&state.pool, OrderScope::for_viewer(&viewer), &filter)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let total_pages = if page.total == 0 {
        0
    } else {
        (page.total + page.limit - 1) / page.limit
    };
    let data = OrderList {
        orders: page.orders.iter().map(OrderSummary::from).collect(),
        pagination: Pagination {
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages,
        },
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// GET /api/v1/orders/{id}
pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderDetail>>, ApiError> {
    let rid = &req_id.0;
    let order = load_visible_order(&state, rid, &viewer, order_id).await?;

    let items = souqcart_db::list_order_items(&state.pool, order.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = OrderDetail {
        summary: OrderSummary::from(&order),
        shipping_address: order.shipping_address.0,
        notes: order.notes,
        items: items.into_iter().map(OrderItem::from).collect(),
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// POST /api/v1/orders/{id}/cancel — the customer who placed a pending
/// order withdraws it.
pub(super) async fn cancel_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderSummary>>, ApiError> {
    let rid = &req_id.0;

    let order = match souqcart_db::get_order(&state.pool, order_id).await {
        Ok(order) => order,
        Err(DbError::NotFound) => {
            return Err(ApiError::new(rid, "not_found", "order not found"));
        }
        Err(e) => return Err(map_db_error(rid.clone(), &e)),
    };
    if order.user_id != viewer.user_id {
        return Err(forbidden(rid));
    }

    let current = order.state().map_err(|e| map_db_error(rid.clone(), &e))?;
    let updated = match current
        .cancel()
        .map_err(|e| map_transition_error(rid.clone(), &e))?
    {
        Transition::Applied(next) => {
            souqcart_db::cancel_order(&state.pool, order.id, current, next)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?
        }
        Transition::Unchanged => order,
    };

    tracing::info!(
        order_id = %updated.id,
        user_id = %viewer.user_id,
        "order cancelled by customer"
    );
    Ok(Json(ApiResponse::new(
        OrderSummary::from(&updated),
        req_id.0,
    )))
}

/// PUT /api/v1/orders/{id}/status — fulfillment updates by vendors and
/// admins; refunds and cancellations by admins only.
pub(super) async fn update_order_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<OrderSummary>>, ApiError> {
    let rid = &req_id.0;

    if !viewer.role.can_manage_fulfillment() {
        return Err(forbidden(rid));
    }
    // Cancelling and refunding span every store on the order.
    let admin_only = matches!(body.status, OrderStatus::Refunded | OrderStatus::Cancelled);
    if admin_only && !viewer.role.can_administer() {
        return Err(forbidden(rid));
    }

    let order = load_visible_order(&state, rid, &viewer, order_id).await?;
    let current = order.state().map_err(|e| map_db_error(rid.clone(), &e))?;

    let updated = match current
        .request_status(body.status)
        .map_err(|e| map_transition_error(rid.clone(), &e))?
    {
        Transition::Applied(next) if next.status == OrderStatus::Cancelled => {
            souqcart_db::cancel_order(&state.pool, order.id, current, next).await
        }
        Transition::Applied(next) => {
            souqcart_db::transition_order(&state.pool, order.id, current, next, None).await
        }
        Transition::Unchanged => Ok(order),
    }
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(
        order_id = %updated.id,
        user_id = %viewer.user_id,
        role = viewer.role.as_str(),
        status = %updated.status,
        payment_status = %updated.payment_status,
        "order status updated"
    );
    Ok(Json(ApiResponse::new(
        OrderSummary::from(&updated),
        req_id.0,
    )))
}
