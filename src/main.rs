mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod rest;
mod services;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use sqlx::sqlite::SqlitePool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{config::Config, services::images::ImageStore};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
    pub images: ImageStore,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "coupon_server=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let pool = db::connect(&config.database_url).await?;
    tracing::info!("Database ready, migrations applied");

    // Load signing keys
    let encoding_key = EncodingKey::from_ed_pem(&std::fs::read(&config.jwt_private_key_path)?)?;
    let decoding_key = DecodingKey::from_ed_pem(&std::fs::read(&config.jwt_public_key_path)?)?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let images = ImageStore::new(config.upload_dir.clone());

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        db: pool,
        encoding_key,
        decoding_key,
        images,
        config: Arc::new(config),
    };

    let app = rest::router(app_state);
    tracing::info!("REST API listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("REST server error: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down");
}
