use super::{ApiJson, ApiResponse, ApiResult, AppError, AppState, Created};
use crate::auth::AuthenticatedUser;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use zygote::learner::{
    BookmarkedTopic, PreferencesUpdate, UserAnalytics, UserPreferences, analytics, bookmarks,
    preferences,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRequest {
    #[serde(default)]
    pub topic_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub topic_id: String,
}

/// Created with defaults on first read.
pub async fn get_preferences_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<UserPreferences> {
    let prefs = preferences::get_preferences(app_state.db(), &user.id).await?;
    Ok(Json(ApiResponse::data(prefs)))
}

pub async fn update_preferences_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<PreferencesUpdate>,
) -> ApiResult<UserPreferences> {
    let prefs = preferences::update_preferences(app_state.db(), &user.id, payload).await?;
    Ok(Json(ApiResponse::with_message(
        "Preferences updated successfully.",
        prefs,
    )))
}

pub async fn list_bookmarks_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<Vec<BookmarkedTopic>> {
    let bookmarked = bookmarks::list_bookmarks(app_state.db(), &user.id).await?;
    Ok(Json(ApiResponse::data(bookmarked)))
}

/// Idempotent: bookmarking twice leaves one row.
pub async fn add_bookmark_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(payload): ApiJson<BookmarkRequest>,
) -> Result<Created<Bookmark>, AppError> {
    let topic_id = payload.topic_id.trim();
    if topic_id.is_empty() {
        return Err(AppError::Validation("Topic ID is required.".to_string()));
    }
    bookmarks::add_bookmark(app_state.db(), &user.id, topic_id).await?;
    Ok(Created(ApiResponse::with_message(
        "Bookmark added successfully.",
        Bookmark {
            topic_id: topic_id.to_string(),
        },
    )))
}

pub async fn remove_bookmark_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(topic_id): Path<String>,
) -> ApiResult<()> {
    bookmarks::remove_bookmark(app_state.db(), &user.id, &topic_id).await?;
    Ok(Json(ApiResponse::message("Bookmark removed successfully.")))
}

pub async fn analytics_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<UserAnalytics> {
    let summary = analytics::user_analytics(app_state.db(), &user.id).await?;
    Ok(Json(ApiResponse::data(summary)))
}
