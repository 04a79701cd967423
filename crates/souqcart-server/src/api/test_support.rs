//! Fixtures shared by the router tests.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::Value;
use souqcart_core::{AppConfig, Environment, Role};
use souqcart_db::NewProduct;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use super::{build_app, default_rate_limit_state, AppState};

pub(crate) const WEBHOOK_SECRET: &str = "whsec_router_tests";

pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".to_string(),
        env: Environment::Test,
        bind_addr: "127.0.0.1:0".parse().expect("socket addr"),
        log_level: "info".to_string(),
        public_base_url: "http://localhost:3000/".to_string(),
        currency: "usd".to_string(),
        stripe_secret_key: Some("sk_test_router".to_string()),
        stripe_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        stripe_api_base: "http://127.0.0.1:1".to_string(),
        gateway_timeout_secs: 5,
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
    }
}

/// App without a payment gateway: only cash-on-delivery checkout works.
pub(crate) fn app(pool: PgPool) -> Router {
    build_app(
        AppState {
            pool,
            config: Arc::new(test_config()),
            payments: None,
        },
        default_rate_limit_state(),
    )
}

/// App whose gateway client talks to `gateway_base` (a wiremock server).
pub(crate) fn app_with_gateway(pool: PgPool, gateway_base: &str) -> Router {
    let payments = souqcart_payments::StripeClient::with_base_url("sk_test_router", 5, gateway_base)
        .expect("gateway client");
    build_app(
        AppState {
            pool,
            config: Arc::new(test_config()),
            payments: Some(payments),
        },
        default_rate_limit_state(),
    )
}

pub(crate) fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

/// Send one request and return the status with the parsed JSON body.
pub(crate) async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json parse")
    };
    (status, json)
}

pub(crate) struct User {
    pub id: Uuid,
    pub token: String,
}

pub(crate) async fn user_with_session(pool: &PgPool, email: &str, role: Role) -> User {
    let user = souqcart_db::create_user(pool, email, "Router Test", role)
        .await
        .unwrap_or_else(|e| panic!("create user {email}: {e}"));
    let session = souqcart_db::create_session(pool, user.id, Duration::hours(1))
        .await
        .expect("create session");
    User {
        id: user.id,
        token: session.token,
    }
}

pub(crate) struct Store {
    pub owner: User,
    pub vendor_id: Uuid,
}

pub(crate) async fn vendor_store(pool: &PgPool, email: &str) -> Store {
    let owner = user_with_session(pool, email, Role::Vendor).await;
    let vendor = souqcart_db::create_vendor(pool, owner.id, "Router Store", true)
        .await
        .expect("create vendor");
    Store {
        owner,
        vendor_id: vendor.id,
    }
}

pub(crate) async fn product(pool: &PgPool, vendor_id: Uuid, price: &str, stock: i32) -> Uuid {
    souqcart_db::create_product(
        pool,
        vendor_id,
        &NewProduct {
            name: format!("Product {price}"),
            price: dec(price),
            stock,
            active: true,
        },
    )
    .await
    .expect("create product")
    .id
}

pub(crate) fn address_json() -> Value {
    serde_json::json!({
        "full_name": "Layla Haddad",
        "phone": "+962 7 9000 0000",
        "street": "12 Rainbow St",
        "city": "Amman",
        "country": "JO"
    })
}
