use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::{config::Config, db, services::images::ImageStore, AppState};

const PRIVATE_KEY: &[u8] = include_bytes!("../tests/fixtures/ed25519_private.pem");
const PUBLIC_KEY: &[u8] = include_bytes!("../tests/fixtures/ed25519_public.pem");

pub const BASE_URL: &str = "https://coupons.test";

/// Fresh in-memory database. A single never-recycled connection keeps the
/// schema alive for the whole test.
pub async fn pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

pub async fn account(pool: &SqlitePool, email: &str) -> i64 {
    db::users::insert(pool, email, "unused-hash", None)
        .await
        .expect("insert account")
        .id
}

pub async fn state() -> AppState {
    let upload_dir =
        std::env::temp_dir().join(format!("coupon-uploads-{}", rand::random::<u64>()));
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        base_url: BASE_URL.to_string(),
        upload_dir: upload_dir.clone(),
        jwt_private_key_path: "tests/fixtures/ed25519_private.pem".into(),
        jwt_public_key_path: "tests/fixtures/ed25519_public.pem".into(),
        token_ttl_hours: 1,
        max_upload_bytes: 1024 * 1024,
    };

    AppState {
        db: pool().await,
        encoding_key: EncodingKey::from_ed_pem(PRIVATE_KEY).expect("fixture private key"),
        decoding_key: DecodingKey::from_ed_pem(PUBLIC_KEY).expect("fixture public key"),
        images: ImageStore::new(upload_dir),
        config: Arc::new(config),
    }
}
