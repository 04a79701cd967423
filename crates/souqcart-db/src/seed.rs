use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const DEMO_USERS: &[(&str, &str, &str)] = &[
    ("admin@souqcart.test", "Store Admin", "admin"),
    ("vendor@souqcart.test", "Dar Al Tamr", "vendor"),
    ("customer@souqcart.test", "Layla Haddad", "customer"),
];

// (name, price in cents, stock)
const DEMO_PRODUCTS: &[(&str, i64, i32)] = &[
    ("Medjool Dates 1kg", 7_999, 40),
    ("Saffron 5g", 2_450, 25),
    ("Cardamom Coffee 500g", 1_899, 60),
    ("Rose Water 250ml", 650, 100),
];

/// Rows written (inserted or already present) by [`seed_demo_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub vendors: usize,
    pub products: usize,
    pub coupons: usize,
}

/// Insert demo users, one approved vendor store with a small catalog, and
/// the `WELCOME10` and `FLAT10` coupons.
///
/// Safe to run repeatedly: existing rows are left untouched. Everything runs
/// in a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn seed_demo_data(pool: &PgPool) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();
    let mut vendor_user_id = None;

    for (email, name, role) in DEMO_USERS {
        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, name, role) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email \
             RETURNING id",
        )
        .bind(email)
        .bind(name)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;
        if *role == "vendor" {
            vendor_user_id = Some(user_id);
        }
        summary.users += 1;
    }

    if let Some(user_id) = vendor_user_id {
        let vendor_id: Uuid = sqlx::query_scalar(
            "INSERT INTO vendors (user_id, store_name, approved) VALUES ($1, 'Dar Al Tamr', true) \
             ON CONFLICT (user_id) DO UPDATE SET approved = true \
             RETURNING id",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        summary.vendors += 1;

        for (name, cents, stock) in DEMO_PRODUCTS {
            sqlx::query(
                "INSERT INTO products (vendor_id, name, price, stock) \
                 SELECT $1, $2, $3, $4 \
                 WHERE NOT EXISTS (SELECT 1 FROM products WHERE vendor_id = $1 AND name = $2)",
            )
            .bind(vendor_id)
            .bind(name)
            .bind(Decimal::new(*cents, 2))
            .bind(stock)
            .execute(&mut *tx)
            .await?;
            summary.products += 1;
        }
    }

    let start = Utc::now() - Duration::days(1);
    let end = Utc::now() + Duration::days(365);
    let coupons: [(&str, &str, &str, Decimal, Option<Decimal>); 2] = [
        (
            "WELCOME10",
            "10% off your first order",
            "percentage",
            Decimal::TEN,
            None,
        ),
        (
            "FLAT10",
            "$10 off orders of $30 or more",
            "fixed",
            Decimal::TEN,
            Some(Decimal::new(30, 0)),
        ),
    ];
    for (code, description, kind, value, min_order) in coupons {
        sqlx::query(
            "INSERT INTO coupons (code, description, kind, value, min_order_amount, \
                                  start_date, end_date, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, true) \
             ON CONFLICT (code) DO NOTHING",
        )
        .bind(code)
        .bind(description)
        .bind(kind)
        .bind(value)
        .bind(min_order)
        .bind(start)
        .bind(end)
        .execute(&mut *tx)
        .await?;
        summary.coupons += 1;
    }

    tx.commit().await?;
    Ok(summary)
}
