//! Offline unit tests for souqcart-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use rust_decimal::Decimal;
use souqcart_core::{AddressSnapshot, AppConfig, Environment, OrderStatus, PaymentStatus};
use souqcart_db::{DbError, OrderRow, PoolConfig};
use sqlx::types::Json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

fn order_row(status: &str, payment_status: &str) -> OrderRow {
    OrderRow {
        id: Uuid::new_v4(),
        order_number: "SC-LZ3K9Q2M-7XQ2".to_string(),
        user_id: Uuid::new_v4(),
        coupon_id: None,
        subtotal: Decimal::new(7999, 2),
        shipping_cost: Decimal::ZERO,
        tax: Decimal::new(1200, 2),
        discount: Decimal::new(800, 2),
        total: Decimal::new(8399, 2),
        status: status.to_string(),
        payment_status: payment_status.to_string(),
        payment_method: "stripe".to_string(),
        shipping_method: "standard".to_string(),
        shipping_address: Json(AddressSnapshot {
            full_name: "Layla Haddad".to_string(),
            phone: None,
            street: "12 King Fahd Rd".to_string(),
            city: "Riyadh".to_string(),
            state: None,
            country: "SA".to_string(),
            zip_code: None,
        }),
        notes: None,
        gateway_session_id: None,
        gateway_payment_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        currency: "usd".to_string(),
        stripe_secret_key: None,
        stripe_webhook_secret: None,
        stripe_api_base: "https://api.stripe.com".to_string(),
        gateway_timeout_secs: 15,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn order_row_state_parses_stored_statuses() {
    let state = order_row("CONFIRMED", "PAID").state().expect("valid state");
    assert_eq!(state.status, OrderStatus::Confirmed);
    assert_eq!(state.payment_status, PaymentStatus::Paid);
}

#[test]
fn order_row_state_rejects_unknown_values() {
    let err = order_row("LOST", "PAID").state().unwrap_err();
    assert!(matches!(err, DbError::InvalidData(_)), "got {err:?}");
}
