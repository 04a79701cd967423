use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so tests
/// can drive them with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SOUQCART_ENV", "development"))?;

    let bind_addr = parse_addr("SOUQCART_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("SOUQCART_LOG_LEVEL", "info");
    let public_base_url = or_default("SOUQCART_PUBLIC_BASE_URL", "http://localhost:3000")
        .trim_end_matches('/')
        .to_string();

    let currency = or_default("SOUQCART_CURRENCY", "usd").to_lowercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(
            "SOUQCART_CURRENCY",
            format!("expected a 3-letter ISO 4217 code, got '{currency}'"),
        ));
    }

    // Card payments cannot work without gateway credentials, so only local
    // development may run without them.
    let (stripe_secret_key, stripe_webhook_secret) = if env == Environment::Development {
        (
            lookup("STRIPE_SECRET_KEY").ok().filter(|v| !v.is_empty()),
            lookup("STRIPE_WEBHOOK_SECRET").ok().filter(|v| !v.is_empty()),
        )
    } else {
        (
            Some(require("STRIPE_SECRET_KEY")?),
            Some(require("STRIPE_WEBHOOK_SECRET")?),
        )
    };
    let stripe_api_base = or_default("STRIPE_API_BASE", "https://api.stripe.com");
    let gateway_timeout_secs = parse_u64("SOUQCART_GATEWAY_TIMEOUT_SECS", "15")?;

    let db_max_connections = parse_u32("SOUQCART_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SOUQCART_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SOUQCART_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    if db_min_connections > db_max_connections {
        return Err(invalid(
            "SOUQCART_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds SOUQCART_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        public_base_url,
        currency,
        stripe_secret_key,
        stripe_webhook_secret,
        stripe_api_base,
        gateway_timeout_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SOUQCART_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
