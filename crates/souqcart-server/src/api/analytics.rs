use axum::{extract::State, Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use souqcart_core::{Role, SalesSummary};
use souqcart_db::{AccountCounts, DbError, ProductCounts};

use crate::middleware::{RequestId, RequireSession};

use super::{forbidden, map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct AccountData {
    customers: i64,
    vendors: i64,
    pending_vendors: i64,
}

impl From<AccountCounts> for AccountData {
    fn from(c: AccountCounts) -> Self {
        Self {
            customers: c.customers,
            vendors: c.vendors,
            pending_vendors: c.pending_vendors,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CatalogData {
    products: i64,
    active_products: i64,
}

impl From<ProductCounts> for CatalogData {
    fn from(c: ProductCounts) -> Self {
        Self {
            products: c.products,
            active_products: c.active_products,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct AdminAnalytics {
    accounts: AccountData,
    catalog: CatalogData,
    sales: SalesSummary,
}

#[derive(Debug, Serialize)]
pub(super) struct VendorAnalytics {
    vendor_id: Uuid,
    catalog: CatalogData,
    /// Amounts are the value of this store's lines only.
    sales: SalesSummary,
}

async fn sales_summary(
    state: &AppState,
    vendor_id: Option<Uuid>,
) -> Result<SalesSummary, DbError> {
    let groups = souqcart_db::sales_groups(&state.pool, vendor_id).await?;
    Ok(SalesSummary::from_groups(&groups))
}

/// GET /api/v1/analytics/admin — marketplace-wide dashboard numbers.
pub(super) async fn admin_analytics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
) -> Result<Json<ApiResponse<AdminAnalytics>>, ApiError> {
    let rid = &req_id.0;
    if !viewer.role.can_administer() {
        return Err(forbidden(rid));
    }

    let (accounts, catalog, sales) = tokio::try_join!(
        souqcart_db::account_counts(&state.pool),
        souqcart_db::product_counts(&state.pool, None),
        sales_summary(&state, None),
    )
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        AdminAnalytics {
            accounts: accounts.into(),
            catalog: catalog.into(),
            sales,
        },
        req_id.0,
    )))
}

/// GET /api/v1/analytics/vendor — the caller's own store.
pub(super) async fn vendor_analytics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    RequireSession(viewer): RequireSession,
) -> Result<Json<ApiResponse<VendorAnalytics>>, ApiError> {
    let rid = &req_id.0;
    let vendor_id = match (viewer.role, viewer.vendor_id) {
        (Role::Vendor, Some(vendor_id)) => vendor_id,
        _ => return Err(forbidden(rid)),
    };

    let (catalog, sales) = tokio::try_join!(
        souqcart_db::product_counts(&state.pool, Some(vendor_id)),
        sales_summary(&state, Some(vendor_id)),
    )
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        VendorAnalytics {
            vendor_id,
            catalog: catalog.into(),
            sales,
        },
        req_id.0,
    )))
}
