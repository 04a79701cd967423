//! Database operations for `addresses`.
//!
//! At most one address per user has `is_default = true`. Every write that
//! can set the flag locks the owning user row, clears the flag on the
//! user's other addresses and sets it on the target, all in one transaction.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use souqcart_core::{AddressInput, AddressSnapshot};

use crate::DbError;

const ADDRESS_COLUMNS: &str = "id, user_id, label, full_name, phone, street, city, state, \
     country, zip_code, is_default, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AddressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub zip_code: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AddressRow {
    #[must_use]
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            zip_code: self.zip_code.clone(),
        }
    }
}

/// Serialize default-flag writers for one user.
async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<(), DbError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok(())
}

async fn clear_defaults(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    except: Option<Uuid>,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE addresses SET is_default = false, updated_at = NOW() \
         WHERE user_id = $1 AND is_default AND ($2::uuid IS NULL OR id <> $2)",
    )
    .bind(user_id)
    .bind(except)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Default address first, then oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_addresses(pool: &PgPool, user_id: Uuid) -> Result<Vec<AddressRow>, DbError> {
    let rows = sqlx::query_as::<_, AddressRow>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses \
         WHERE user_id = $1 \
         ORDER BY is_default DESC, created_at, id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no address has this id.
pub async fn get_address(pool: &PgPool, id: Uuid) -> Result<AddressRow, DbError> {
    sqlx::query_as::<_, AddressRow>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Save a new address. A user's first address always becomes the default.
///
/// `input` is expected to be normalized with [`AddressInput::normalized`].
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn create_address(
    pool: &PgPool,
    user_id: Uuid,
    input: &AddressInput,
) -> Result<AddressRow, DbError> {
    let mut tx = pool.begin().await?;
    lock_user(&mut tx, user_id).await?;

    let existing: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
    let make_default = input.is_default || existing == 0;
    if make_default {
        clear_defaults(&mut tx, user_id, None).await?;
    }

    let row = sqlx::query_as::<_, AddressRow>(&format!(
        "INSERT INTO addresses (user_id, label, full_name, phone, street, city, state, \
                                country, zip_code, is_default) \
         VALUES ($1, COALESCE($2, 'Home'), $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {ADDRESS_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&input.label)
    .bind(&input.full_name)
    .bind(&input.phone)
    .bind(&input.street)
    .bind(&input.city)
    .bind(&input.state)
    .bind(&input.country)
    .bind(&input.zip_code)
    .bind(make_default)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Replace the fields of one of `user_id`'s addresses.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the address does not exist or belongs
/// to another user.
pub async fn update_address(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    input: &AddressInput,
) -> Result<AddressRow, DbError> {
    let mut tx = pool.begin().await?;
    lock_user(&mut tx, user_id).await?;

    if input.is_default {
        clear_defaults(&mut tx, user_id, Some(id)).await?;
    }

    let row = sqlx::query_as::<_, AddressRow>(&format!(
        "UPDATE addresses \
         SET label = COALESCE($3, 'Home'), full_name = $4, phone = $5, street = $6, city = $7, \
             state = $8, country = $9, zip_code = $10, is_default = $11, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING {ADDRESS_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(&input.label)
    .bind(&input.full_name)
    .bind(&input.phone)
    .bind(&input.street)
    .bind(&input.city)
    .bind(&input.state)
    .bind(&input.country)
    .bind(&input.zip_code)
    .bind(input.is_default)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    tx.commit().await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the address does not exist or belongs
/// to another user.
pub async fn delete_address(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Make `id` the user's only default address.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the address does not exist or belongs
/// to another user; nothing is changed in that case.
pub async fn set_default_address(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<AddressRow, DbError> {
    let mut tx = pool.begin().await?;
    lock_user(&mut tx, user_id).await?;
    clear_defaults(&mut tx, user_id, Some(id)).await?;

    let row = sqlx::query_as::<_, AddressRow>(&format!(
        "UPDATE addresses SET is_default = true, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING {ADDRESS_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    tx.commit().await?;
    Ok(row)
}
