use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};

use crate::{db, error::AppError, models::user::Claims, AppState};

/// The account a request was authenticated as. Owner-scoped handlers take
/// this as an argument; nothing about the caller is kept anywhere else.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
}

pub fn issue_token(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let ttl_hours = state.config.token_ttl_hours;
    if ttl_hours <= 0 {
        return Err(AppError::Config(format!(
            "token lifetime must be positive, got {} hours",
            ttl_hours
        )));
    }

    let expiration = chrono::Duration::try_hours(ttl_hours)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .and_then(|exp| usize::try_from(exp.timestamp()).ok())
        .ok_or_else(|| AppError::Config("token lifetime out of range".to_string()))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };

    let header = Header::new(Algorithm::EdDSA);
    Ok(encode(&header, &claims, &state.encoding_key)?)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::AuthError("Not authorized, no token".to_string()))?;

        let validation = Validation::new(Algorithm::EdDSA);
        let claims = decode::<Claims>(token, &state.decoding_key, &validation)
            .map_err(|e| {
                tracing::warn!("JWT validation failed: {}", e);
                AppError::AuthError("Not authorized, token failed".to_string())
            })?
            .claims;

        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Not authorized, token failed".to_string()))?;

        // Tokens outlive accounts; make sure the owner still exists.
        db::users::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| AppError::AuthError("Not authorized, unknown account".to_string()))?;

        Ok(AuthUser { id })
    }
}
