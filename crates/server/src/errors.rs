use axum::{
    Json,
    extract::{
        Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use core_access::CoreAccessError;
use serde_json::{Value, json};
use tracing::{error, warn};
use zygote::ZygoteError;

/// Everything a handler or extractor can fail with, already classified by
/// the status and code the client sees.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    EmailExists(String),
    NoToken,
    InvalidToken(String),
    TokenExpired,
    InvalidCredentials,
    EmailNotVerified { user_id: String, email: String },
    InsufficientRole,
    SubscriptionRequired,
    NotFound(String),
    RateLimited,
    Internal(anyhow::Error),
}

/// The real cause of a 500, attached to the response for
/// [`expose_error_details`] to pick up in development.
#[derive(Debug, Clone)]
pub struct ServerErrorDetail {
    pub message: String,
    pub stack: Vec<String>,
}

impl From<CoreAccessError> for AppError {
    fn from(err: CoreAccessError) -> Self {
        match err {
            CoreAccessError::Validation(msg) => AppError::Validation(msg),
            CoreAccessError::Conflict(msg) => AppError::EmailExists(msg),
            CoreAccessError::InvalidCredentials => AppError::InvalidCredentials,
            CoreAccessError::EmailNotVerified { user_id, email } => {
                AppError::EmailNotVerified { user_id, email }
            }
            err @ CoreAccessError::InvalidOtp => AppError::Validation(err.to_string()),
            CoreAccessError::NotFound(msg) => AppError::NotFound(msg),
            CoreAccessError::TokenExpired => AppError::TokenExpired,
            CoreAccessError::TokenInvalid(reason) => AppError::InvalidToken(reason),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<ZygoteError> for AppError {
    fn from(err: ZygoteError) -> Self {
        match err {
            ZygoteError::Validation(msg) => AppError::Validation(msg),
            ZygoteError::NotFound(msg) => AppError::NotFound(msg),
            ZygoteError::Access(inner) => inner.into(),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::EmailExists(_) => (StatusCode::BAD_REQUEST, "EMAIL_EXISTS"),
            AppError::NoToken => (StatusCode::UNAUTHORIZED, "NO_TOKEN"),
            AppError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::EmailNotVerified { .. } => (StatusCode::UNAUTHORIZED, "EMAIL_NOT_VERIFIED"),
            AppError::InsufficientRole => (StatusCode::FORBIDDEN, "INSUFFICIENT_ROLE"),
            AppError::SubscriptionRequired => (StatusCode::FORBIDDEN, "SUBSCRIPTION_REQUIRED"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR"),
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::EmailExists(msg) | AppError::NotFound(msg) => {
                msg.clone()
            }
            AppError::NoToken => "Access denied. No token provided.".to_string(),
            AppError::InvalidToken(_) => "Invalid token.".to_string(),
            AppError::TokenExpired => "Token expired. Please login again.".to_string(),
            AppError::InvalidCredentials => "Invalid email or password.".to_string(),
            AppError::EmailNotVerified { .. } => {
                "Email not verified. OTP sent to your email.".to_string()
            }
            AppError::InsufficientRole => "Access denied. Insufficient permissions.".to_string(),
            AppError::SubscriptionRequired => {
                "Active subscription required to access this content.".to_string()
            }
            AppError::RateLimited => {
                "Too many requests from this IP, please try again later.".to_string()
            }
            AppError::Internal(_) => "An error occurred. Please try again later.".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let mut body = json!({
            "success": false,
            "message": self.client_message(),
            "code": code,
        });

        match &self {
            AppError::EmailNotVerified { user_id, email } => {
                body["data"] = json!({ "userId": user_id, "email": email });
            }
            AppError::InvalidToken(reason) => warn!(%reason, "Rejected token"),
            _ => {}
        }

        let detail = match self {
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                Some(ServerErrorDetail {
                    message: err.to_string(),
                    stack: err.chain().map(|cause| cause.to_string()).collect(),
                })
            }
            _ => None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(detail);
        }
        response
    }
}

/// Development-only layer: replaces the sanitised 500 message with the real
/// one and adds the error chain as `stack`.
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(detail) = response.extensions().get::<ServerErrorDetail>().cloned() else {
        return response;
    };
    let body: Value = json!({
        "success": false,
        "message": detail.message,
        "code": "SERVER_ERROR",
        "stack": detail.stack,
    });
    (response.status(), Json(body)).into_response()
}

/// Fallback for unknown routes.
pub async fn route_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_errors_map_to_client_codes() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (
                CoreAccessError::Conflict("Email already registered.".into()).into(),
                StatusCode::BAD_REQUEST,
                "EMAIL_EXISTS",
            ),
            (
                CoreAccessError::InvalidOtp.into(),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                CoreAccessError::TokenExpired.into(),
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
            ),
            (
                ZygoteError::not_found("Topic").into(),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                ZygoteError::Access(CoreAccessError::InvalidCredentials).into(),
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
            ),
            (
                ZygoteError::DataIntegrity("broken".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERVER_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[test]
    fn server_errors_hide_their_cause() {
        let err = AppError::Internal(anyhow::anyhow!("disk on fire"));
        assert_eq!(
            err.client_message(),
            "An error occurred. Please try again later."
        );
        let response = err.into_response();
        let detail = response.extensions().get::<ServerErrorDetail>().unwrap();
        assert_eq!(detail.message, "disk on fire");
    }
}
