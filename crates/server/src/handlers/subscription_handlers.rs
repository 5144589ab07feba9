use super::{ApiJson, ApiResponse, ApiResult, AppError, AppState, Created};
use crate::auth::AuthenticatedUser;
use axum::{Json, extract::State};
use serde::Deserialize;
use zygote::{
    Plan, Subscription,
    subscriptions::{self, parse_plan},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    #[serde(default)]
    pub plan_type: String,
}

/// The static plan catalogue. Public.
pub async fn list_plans_handler() -> ApiResult<&'static [Plan]> {
    Ok(Json(ApiResponse::data(subscriptions::plans())))
}

/// `data` is `null` when the caller has no current subscription.
pub async fn my_subscription_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<Option<Subscription>> {
    let current = subscriptions::current_subscription(app_state.db(), &user.id).await?;
    Ok(Json(ApiResponse {
        success: true,
        message: None,
        data: Some(current),
        code: None,
    }))
}

/// Starts a subscription immediately. No payment is captured.
pub async fn create_subscription_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateSubscriptionRequest>,
) -> Result<Created<Subscription>, AppError> {
    let plan = parse_plan(&payload.plan_type)?;
    let subscription =
        subscriptions::create_subscription(app_state.db(), &user.id, plan).await?;
    Ok(Created(ApiResponse::with_message(
        "Subscription created successfully.",
        subscription,
    )))
}

/// Returns the cancelled row.
pub async fn cancel_subscription_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<Subscription> {
    let cancelled = subscriptions::cancel_subscription(app_state.db(), &user.id).await?;
    Ok(Json(ApiResponse::with_message(
        "Subscription cancelled successfully.",
        cancelled,
    )))
}
