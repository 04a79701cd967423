mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(souqcart_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = souqcart_db::PoolConfig::from_app_config(&config);
    let pool = souqcart_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = souqcart_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let payments = match config.stripe_secret_key.as_deref() {
        Some(key) => Some(souqcart_payments::StripeClient::with_base_url(
            key,
            config.gateway_timeout_secs,
            &config.stripe_api_base,
        )?),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set; card checkout disabled");
            None
        }
    };

    let app = build_app(
        AppState {
            pool,
            config: Arc::clone(&config),
            payments,
        },
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "souqcart-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
