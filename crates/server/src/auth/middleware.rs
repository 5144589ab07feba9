//! # Authentication Middleware
//!
//! Extractors that read the `Authorization: Bearer <token>` header, verify the
//! access token and then re-read the user row, so a deactivated or deleted
//! account loses access even while its token is still unexpired.

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use core_access::{User, resolve_active_user, token::decode_access_token};
use tracing::{debug, warn};

/// The caller of an endpoint that requires authentication.
///
/// Rejects with `NO_TOKEN` when the header is missing or not a bearer token,
/// `TOKEN_EXPIRED` for expired tokens and `INVALID_TOKEN` for everything
/// else, including tokens whose account is gone or deactivated.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The caller of an optional-auth endpoint. Any token problem is treated as
/// an anonymous request.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

async fn bearer_token(parts: &mut Parts, state: &AppState) -> Option<String> {
    match <TypedHeader<Authorization<Bearer>> as OptionalFromRequestParts<AppState>>::from_request_parts(
        parts, state,
    )
    .await
    {
        Ok(Some(TypedHeader(Authorization(bearer)))) => Some(bearer.token().to_string()),
        Ok(None) => None,
        Err(e) => {
            debug!("Unusable Authorization header: {e}");
            None
        }
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await.ok_or_else(|| {
            warn!(path = %parts.uri.path(), "Request without bearer token");
            AppError::NoToken
        })?;
        let claims = decode_access_token(&token, state.accounts.token_config())?;
        let user = resolve_active_user(state.db(), &claims).await?;
        Ok(AuthenticatedUser(user))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if bearer_token(parts, state).await.is_none() {
            return Ok(MaybeUser(None));
        }
        match AuthenticatedUser::from_request_parts(parts, state).await {
            Ok(AuthenticatedUser(user)) => Ok(MaybeUser(Some(user))),
            Err(AppError::Internal(err)) => Err(AppError::Internal(err)),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}
