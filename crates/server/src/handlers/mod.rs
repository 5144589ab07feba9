//! # API Route Handlers
//!
//! The Axum handlers for `zygote-server`, split by area: authentication,
//! public content, administration, learner state and subscriptions.

pub mod admin_handlers;
pub mod auth_handlers;
pub mod content_handlers;
pub mod general;
pub mod subscription_handlers;
pub mod user_handlers;

// Re-exported so the router can address every handler as `handlers::*`.
pub use admin_handlers::*;
pub use auth_handlers::*;
pub use content_handlers::*;
pub use general::*;
pub use subscription_handlers::*;
pub use user_handlers::*;

// Shared items used by multiple handler modules.
use super::{
    errors::AppError,
    state::AppState,
    types::{ApiJson, ApiResponse, Created, EmptyResult},
};
use axum::Json;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
