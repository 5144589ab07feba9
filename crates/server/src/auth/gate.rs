use super::AuthenticatedUser;
use crate::{errors::AppError, state::AppState};
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use core_access::{User, policy};
use tracing::warn;
use zygote::{ZygoteError, content::topics::topic_access, subscriptions::has_active_subscription};

/// Admin routes: the caller must be authenticated and hold one of the roles
/// the policy table lists for the matched `(method, route)`.
pub async fn require_route_policy(
    matched: MatchedPath,
    AuthenticatedUser(user): AuthenticatedUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let method = request.method().as_str();
    if !policy::is_authorized(method, matched.as_str(), user.role) {
        warn!(
            user_id = %user.id,
            role = %user.role,
            %method,
            route = matched.as_str(),
            "Insufficient role"
        );
        return Err(AppError::InsufficientRole);
    }
    Ok(next.run(request).await)
}

/// Staff always pass; students need an active, unexpired subscription.
pub async fn require_subscription(state: &AppState, user: &User) -> Result<(), AppError> {
    if user.role.is_staff() {
        return Ok(());
    }
    if has_active_subscription(state.db(), &user.id).await? {
        Ok(())
    } else {
        Err(AppError::SubscriptionRequired)
    }
}

/// Guards the body and MCQs of a topic.
///
/// Free samples and topics in free-trial subjects stay open. Hidden or
/// unknown topics pass through so the read itself reports "no content".
pub async fn ensure_topic_access(
    state: &AppState,
    topic_id: &str,
    viewer: Option<&User>,
) -> Result<(), AppError> {
    if !state.config.premium_content_requires_subscription {
        return Ok(());
    }
    let access = match topic_access(state.db(), topic_id).await {
        Ok(access) => access,
        Err(ZygoteError::NotFound(_)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if access.is_free {
        return Ok(());
    }
    match viewer {
        Some(user) => require_subscription(state, user).await,
        None => Err(AppError::NoToken),
    }
}
