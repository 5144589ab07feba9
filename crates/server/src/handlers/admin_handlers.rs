//! # Admin Route Handlers
//!
//! Content management and user administration. Authorization is enforced
//! before these run, by the route policy layer on the admin router.

use super::{ApiJson, ApiResponse, ApiResult, AppError, AppState, Created};
use crate::auth::AuthenticatedUser;
use axum::{
    Json,
    extract::{Path, State},
};
use core_access::{User, UserAccessUpdate, list_users, update_user_access};
use serde::Deserialize;
use tracing::info;
use zygote::content::{
    Mcq, McqUpdate, MindMap, NewMcq, NewMindMap, NewSubject, NewTextContent, NewTopic, NewTrack,
    Subject, SubjectUpdate, TextContent, TextKind, Topic, TopicUpdate, Track, TrackUpdate,
    materials, mcqs, subjects, topics, tracks,
};

type CreatedResult<T> = Result<Created<T>, AppError>;

#[derive(Deserialize)]
pub struct BulkMcqRequest {
    #[serde(default)]
    pub mcqs: Vec<NewMcq>,
}

// --- Tracks ---

pub async fn create_track_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(payload): ApiJson<NewTrack>,
) -> CreatedResult<Track> {
    let track = tracks::create_track(app_state.db(), &actor.id, payload).await?;
    Ok(Created(ApiResponse::with_message(
        "Track created successfully.",
        track,
    )))
}

pub async fn update_track_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(track_id): Path<String>,
    ApiJson(payload): ApiJson<TrackUpdate>,
) -> ApiResult<Track> {
    let track = tracks::update_track(app_state.db(), &actor.id, &track_id, payload).await?;
    Ok(Json(ApiResponse::with_message(
        "Track updated successfully.",
        track,
    )))
}

pub async fn delete_track_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(track_id): Path<String>,
) -> ApiResult<()> {
    tracks::delete_track(app_state.db(), &actor.id, &track_id).await?;
    Ok(Json(ApiResponse::message("Track deleted successfully.")))
}

// --- Subjects ---

pub async fn create_subject_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(payload): ApiJson<NewSubject>,
) -> CreatedResult<Subject> {
    let subject = subjects::create_subject(app_state.db(), &actor.id, payload).await?;
    Ok(Created(ApiResponse::with_message(
        "Subject created successfully.",
        subject,
    )))
}

pub async fn update_subject_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(subject_id): Path<String>,
    ApiJson(payload): ApiJson<SubjectUpdate>,
) -> ApiResult<Subject> {
    let subject =
        subjects::update_subject(app_state.db(), &actor.id, &subject_id, payload).await?;
    Ok(Json(ApiResponse::with_message(
        "Subject updated successfully.",
        subject,
    )))
}

pub async fn delete_subject_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(subject_id): Path<String>,
) -> ApiResult<()> {
    subjects::delete_subject(app_state.db(), &actor.id, &subject_id).await?;
    Ok(Json(ApiResponse::message("Subject deleted successfully.")))
}

// --- Topics ---

pub async fn create_topic_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(payload): ApiJson<NewTopic>,
) -> CreatedResult<Topic> {
    let topic = topics::create_topic(app_state.db(), &actor.id, payload).await?;
    Ok(Created(ApiResponse::with_message(
        "Topic created successfully.",
        topic,
    )))
}

pub async fn update_topic_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(topic_id): Path<String>,
    ApiJson(payload): ApiJson<TopicUpdate>,
) -> ApiResult<Topic> {
    let topic = topics::update_topic(app_state.db(), &actor.id, &topic_id, payload).await?;
    Ok(Json(ApiResponse::with_message(
        "Topic updated successfully.",
        topic,
    )))
}

pub async fn delete_topic_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(topic_id): Path<String>,
) -> ApiResult<()> {
    topics::delete_topic(app_state.db(), &actor.id, &topic_id).await?;
    Ok(Json(ApiResponse::message("Topic deleted successfully.")))
}

// --- Topic bodies ---

async fn create_text(
    app_state: &AppState,
    actor: &User,
    topic_id: &str,
    kind: TextKind,
    payload: NewTextContent,
) -> CreatedResult<TextContent> {
    let content =
        materials::create_text_content(app_state.db(), &actor.id, topic_id, kind, payload).await?;
    Ok(Created(ApiResponse::with_message(
        kind.created_message(),
        content,
    )))
}

pub async fn create_notes_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(topic_id): Path<String>,
    ApiJson(payload): ApiJson<NewTextContent>,
) -> CreatedResult<TextContent> {
    create_text(&app_state, &actor, &topic_id, TextKind::Notes, payload).await
}

pub async fn create_summary_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(topic_id): Path<String>,
    ApiJson(payload): ApiJson<NewTextContent>,
) -> CreatedResult<TextContent> {
    create_text(&app_state, &actor, &topic_id, TextKind::Summary, payload).await
}

pub async fn create_mind_map_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(topic_id): Path<String>,
    ApiJson(payload): ApiJson<NewMindMap>,
) -> CreatedResult<MindMap> {
    let mind_map =
        materials::create_mind_map(app_state.db(), &actor.id, &topic_id, payload).await?;
    Ok(Created(ApiResponse::with_message(
        "Mind map created successfully.",
        mind_map,
    )))
}

// --- MCQs ---

pub async fn create_mcq_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(payload): ApiJson<NewMcq>,
) -> CreatedResult<Mcq> {
    let mcq = mcqs::create_mcq(app_state.db(), &actor.id, payload).await?;
    Ok(Created(ApiResponse::with_message(
        "MCQ created successfully.",
        mcq,
    )))
}

/// All or nothing: one invalid item rejects the whole batch.
pub async fn create_mcqs_bulk_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(payload): ApiJson<BulkMcqRequest>,
) -> CreatedResult<Vec<Mcq>> {
    let created = mcqs::create_mcqs_bulk(app_state.db(), &actor.id, payload.mcqs).await?;
    Ok(Created(ApiResponse::with_message(
        format!("{} MCQs created successfully.", created.len()),
        created,
    )))
}

pub async fn update_mcq_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(mcq_id): Path<String>,
    ApiJson(payload): ApiJson<McqUpdate>,
) -> ApiResult<Mcq> {
    let mcq = mcqs::update_mcq(app_state.db(), &actor.id, &mcq_id, payload).await?;
    Ok(Json(ApiResponse::with_message("MCQ updated successfully.", mcq)))
}

pub async fn delete_mcq_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(mcq_id): Path<String>,
) -> ApiResult<()> {
    mcqs::delete_mcq(app_state.db(), &actor.id, &mcq_id).await?;
    Ok(Json(ApiResponse::message("MCQ deleted successfully.")))
}

// --- Users ---

/// Every account, newest first.
pub async fn list_users_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<Vec<User>> {
    let users = list_users(app_state.db()).await?;
    info!(actor_id = %actor.id, count = users.len(), "Listed users");
    Ok(Json(ApiResponse::data(users)))
}

/// Changes role and/or active flag. The only way an account gets deactivated.
pub async fn update_user_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(user_id): Path<String>,
    ApiJson(payload): ApiJson<UserAccessUpdate>,
) -> ApiResult<User> {
    let user = update_user_access(app_state.db(), &actor.id, &user_id, payload).await?;
    Ok(Json(ApiResponse::with_message(
        "User updated successfully.",
        user,
    )))
}
