//! JWT access tokens and persisted refresh tokens.

use crate::{CoreAccessError, Role, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Secrets and lifetimes for both token kinds.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_secret: String,
    pub refresh_ttl_secs: i64,
}

/// Claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The user's database ID.
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a refresh token. `jti` keeps two tokens issued in the same second distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_access_token(user: &User, config: &TokenConfig) -> Result<String, CoreAccessError> {
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        iat: now,
        exp: now + config.access_ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.access_secret.as_bytes()),
    )
    .map_err(|e| CoreAccessError::Crypto(format!("JWT encode: {e}")))
}

/// Verifies signature and expiry. An expired signature maps to `TokenExpired`
/// so clients can tell "log in again" apart from "bad token".
pub fn decode_access_token(
    token: &str,
    config: &TokenConfig,
) -> Result<AccessClaims, CoreAccessError> {
    decode_with::<AccessClaims>(token, &config.access_secret)
}

/// Issues a refresh token and returns it with its expiry instant.
pub fn issue_refresh_token(
    user_id: &str,
    config: &TokenConfig,
) -> Result<(String, DateTime<Utc>), CoreAccessError> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(config.refresh_ttl_secs);
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        typ: REFRESH_TOKEN_TYPE.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
    )
    .map_err(|e| CoreAccessError::Crypto(format!("JWT encode: {e}")))?;
    Ok((token, expires_at))
}

pub fn decode_refresh_token(
    token: &str,
    config: &TokenConfig,
) -> Result<RefreshClaims, CoreAccessError> {
    let claims = decode_with::<RefreshClaims>(token, &config.refresh_secret)?;
    if claims.typ != REFRESH_TOKEN_TYPE {
        return Err(CoreAccessError::TokenInvalid(
            "Not a refresh token.".to_string(),
        ));
    }
    Ok(claims)
}

fn decode_with<T: for<'de> Deserialize<'de>>(
    token: &str,
    secret: &str,
) -> Result<T, CoreAccessError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => CoreAccessError::TokenExpired,
        _ => CoreAccessError::TokenInvalid(e.to_string()),
    })
}
