//! # Authentication Handlers
//!
//! Registration, login, OTP verification, token refresh, the current-user
//! profile and logout.

use super::{ApiJson, ApiResponse, ApiResult, AppError, AppState, Created};
use crate::auth::AuthenticatedUser;
use axum::{Json, body::Bytes, extract::State};
use core_access::{AuthSession, RegisteredUser, Role, User};
use serde::{Deserialize, Serialize};
use tracing::info;
use zygote::{Subscription, subscriptions::current_subscription};

// --- API Payloads ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp_code: String,
}

#[derive(Deserialize)]
pub struct ResendOtpRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshedToken {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct CurrentUser {
    pub user: User,
    pub subscription: Option<Subscription>,
}

// --- Handlers ---

pub async fn register_handler(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Created<RegisteredUser>, AppError> {
    let registered = app_state
        .accounts
        .register(&payload.email, &payload.password, &payload.full_name)
        .await?;
    Ok(Created(ApiResponse::with_message(
        "Registration successful. Please check your email for OTP verification.",
        registered,
    )))
}

pub async fn login_handler(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<AuthSession> {
    let session = app_state
        .accounts
        .login(&payload.email, &payload.password)
        .await?;
    info!(user_id = %session.user.id, "Login successful");
    Ok(Json(ApiResponse::with_message("Login successful.", session)))
}

pub async fn verify_otp_handler(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyOtpRequest>,
) -> ApiResult<AuthSession> {
    let session = app_state
        .accounts
        .verify_otp(&payload.email, &payload.otp_code)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Email verified successfully.",
        session,
    )))
}

pub async fn resend_otp_handler(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<ResendOtpRequest>,
) -> ApiResult<()> {
    app_state.accounts.resend_otp(&payload.email).await?;
    Ok(Json(ApiResponse::message(
        "OTP sent successfully. Please check your email.",
    )))
}

pub async fn refresh_token_handler(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshTokenRequest>,
) -> ApiResult<RefreshedToken> {
    let refresh_token = payload
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Refresh token is required.".to_string()))?;
    let (user, token) = app_state.accounts.refresh(&refresh_token).await?;
    Ok(Json(ApiResponse::with_message(
        "Token refreshed successfully.",
        RefreshedToken { token, user },
    )))
}

/// The caller's profile; students also get their current subscription.
pub async fn me_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<CurrentUser> {
    let subscription = if user.role == Role::Student {
        current_subscription(app_state.db(), &user.id).await?
    } else {
        None
    };
    Ok(Json(ApiResponse::data(CurrentUser { user, subscription })))
}

/// The body is optional; when it names a refresh token, that token is revoked.
pub async fn logout_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Bytes,
) -> ApiResult<()> {
    let payload: RefreshTokenRequest = if body.is_empty() {
        RefreshTokenRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Failed to parse the request body: {e}")))?
    };
    app_state
        .accounts
        .logout(&user.id, payload.refresh_token.as_deref())
        .await?;
    Ok(Json(ApiResponse::message("Logged out successfully.")))
}
