use std::path::PathBuf;

/// Server configuration, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string
    pub database_url: String,
    pub bind_addr: String,
    /// Prefix of the redemption URL encoded into every QR code
    pub base_url: String,
    /// Directory uploaded coupon images are written to and served from
    pub upload_dir: PathBuf,
    pub jwt_private_key_path: PathBuf,
    pub jwt_public_key_path: PathBuf,
    pub token_ttl_hours: i64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            base_url: std::env::var("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            jwt_private_key_path: std::env::var("JWT_PRIVATE_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("keys/private.pem")),
            jwt_public_key_path: std::env::var("JWT_PUBLIC_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("keys/public.pem")),
            token_ttl_hours: parse_ttl_hours(std::env::var("TOKEN_TTL_HOURS").ok()),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(5 * 1024 * 1024),
        }
    }
}

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Falls back to the default for anything that is not a positive number of
/// hours.
fn parse_ttl_hours(raw: Option<String>) -> i64 {
    match raw.as_deref().map(str::trim).map(str::parse::<i64>) {
        Some(Ok(hours)) if hours > 0 => hours,
        Some(_) => {
            tracing::warn!(
                "TOKEN_TTL_HOURS must be a positive integer, using {}",
                DEFAULT_TOKEN_TTL_HOURS
            );
            DEFAULT_TOKEN_TTL_HOURS
        }
        None => DEFAULT_TOKEN_TTL_HOURS,
    }
}
