//! Users, vendor stores and bearer sessions.
//!
//! Sessions are issued elsewhere (the auth service or `souqcart-cli`); the
//! API only resolves a token into a [`Viewer`].

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use souqcart_core::{Role, Viewer};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VendorRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_name: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ViewerRow {
    user_id: Uuid,
    role: String,
    vendor_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Insert a user. The email is stored lowercased.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the email is taken, or [`DbError::Sqlx`]
/// if the insert fails.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    role: Role,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, name, role) \
         VALUES ($1, $2, $3) \
         RETURNING id, email, name, role, created_at",
    )
    .bind(email.trim().to_lowercase())
    .bind(name.trim())
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has this email.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<UserRow, DbError> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, role, created_at FROM users WHERE email = $1",
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Vendors
// ---------------------------------------------------------------------------

/// Create the vendor store owned by `user_id`.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the user already owns a store.
pub async fn create_vendor(
    pool: &PgPool,
    user_id: Uuid,
    store_name: &str,
    approved: bool,
) -> Result<VendorRow, DbError> {
    let row = sqlx::query_as::<_, VendorRow>(
        "INSERT INTO vendors (user_id, store_name, approved) \
         VALUES ($1, $2, $3) \
         RETURNING id, user_id, store_name, approved, created_at",
    )
    .bind(user_id)
    .bind(store_name.trim())
    .bind(approved)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the user owns no store.
pub async fn get_vendor_by_user(pool: &PgPool, user_id: Uuid) -> Result<VendorRow, DbError> {
    sqlx::query_as::<_, VendorRow>(
        "SELECT id, user_id, store_name, approved, created_at FROM vendors WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Vendor stores, newest first, optionally filtered by approval.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_vendors(
    pool: &PgPool,
    approved: Option<bool>,
    limit: i64,
) -> Result<Vec<VendorRow>, DbError> {
    let rows = sqlx::query_as::<_, VendorRow>(
        "SELECT id, user_id, store_name, approved, created_at FROM vendors \
         WHERE ($1::boolean IS NULL OR approved = $1) \
         ORDER BY created_at DESC, id \
         LIMIT $2",
    )
    .bind(approved)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Approve or suspend a store. Sessions pick the change up on their next
/// request: only approved stores resolve into a viewer's `vendor_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the store does not exist.
pub async fn set_vendor_approval(
    pool: &PgPool,
    vendor_id: Uuid,
    approved: bool,
) -> Result<VendorRow, DbError> {
    sqlx::query_as::<_, VendorRow>(
        "UPDATE vendors SET approved = $2 WHERE id = $1 \
         RETURNING id, user_id, store_name, approved, created_at",
    )
    .bind(vendor_id)
    .bind(approved)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Issue a new session token for `user_id`, valid for `ttl`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (for example, unknown user).
pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl: Duration,
) -> Result<SessionRow, DbError> {
    let token = hex::encode(rand::random::<[u8; 32]>());

    let row = sqlx::query_as::<_, SessionRow>(
        "INSERT INTO sessions (token, user_id, expires_at) \
         VALUES ($1, $2, $3) \
         RETURNING token, user_id, expires_at, created_at",
    )
    .bind(&token)
    .bind(user_id)
    .bind(Utc::now() + ttl)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Resolve a bearer token into the caller it belongs to.
///
/// Returns `None` for unknown or expired tokens. Only approved vendor stores
/// are attached to the viewer.
///
/// # Errors
///
/// Returns [`DbError::InvalidData`] if the stored role is unrecognised, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn viewer_for_session(pool: &PgPool, token: &str) -> Result<Option<Viewer>, DbError> {
    let row = sqlx::query_as::<_, ViewerRow>(
        "SELECT u.id AS user_id, u.role, v.id AS vendor_id \
         FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         LEFT JOIN vendors v ON v.user_id = u.id AND v.approved \
         WHERE s.token = $1 AND s.expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    row.map(|r| {
        let role = r
            .role
            .parse::<Role>()
            .map_err(|e| DbError::InvalidData(e.to_string()))?;
        Ok(Viewer {
            user_id: r.user_id,
            role,
            vendor_id: r.vendor_id,
        })
    })
    .transpose()
}

/// Delete expired sessions and return how many were removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_expired_sessions(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
