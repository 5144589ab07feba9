//! # Content Handlers
//!
//! Public, optional-auth reads of the Track → Subject → Topic hierarchy, the
//! topic bodies behind the premium gate and MCQ answer submission.

use super::{ApiJson, ApiResponse, ApiResult, AppError, AppState, EmptyResult};
use crate::{
    auth::{AuthenticatedUser, MaybeUser, gate::ensure_topic_access},
    types::ApiQuery,
};
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use zygote::content::{
    AnswerOutcome, Mcq, McqQuery, Subject, SubjectDetail, SubmitAnswer, TextKind, Topic,
    TopicDetail, Track, materials, mcqs, subjects, topics, tracks,
};

/// Either the found body or the typed "no content" result.
fn present_or_empty<T: Serialize>(found: Option<T>, empty_message: &'static str) -> Response {
    match found {
        Some(body) => Json(ApiResponse::data(body)).into_response(),
        None => Json(EmptyResult::new(empty_message)).into_response(),
    }
}

pub async fn list_tracks_handler(State(app_state): State<AppState>) -> ApiResult<Vec<Track>> {
    let tracks = tracks::list_tracks(app_state.db()).await?;
    Ok(Json(ApiResponse::data(tracks)))
}

pub async fn get_track_handler(
    State(app_state): State<AppState>,
    Path(track_id): Path<String>,
) -> ApiResult<Track> {
    let track = tracks::get_track(app_state.db(), &track_id).await?;
    Ok(Json(ApiResponse::data(track)))
}

pub async fn list_track_subjects_handler(
    State(app_state): State<AppState>,
    Path(track_id): Path<String>,
) -> ApiResult<Vec<Subject>> {
    let subjects = subjects::list_subjects(app_state.db(), &track_id).await?;
    Ok(Json(ApiResponse::data(subjects)))
}

pub async fn get_subject_handler(
    State(app_state): State<AppState>,
    Path(subject_id): Path<String>,
) -> ApiResult<SubjectDetail> {
    let subject = subjects::get_subject(app_state.db(), &subject_id).await?;
    Ok(Json(ApiResponse::data(subject)))
}

pub async fn list_subject_topics_handler(
    State(app_state): State<AppState>,
    Path(subject_id): Path<String>,
) -> ApiResult<Vec<Topic>> {
    let topics = topics::list_topics(app_state.db(), &subject_id).await?;
    Ok(Json(ApiResponse::data(topics)))
}

/// Signed-in viewers also get an `opened` analytics event.
pub async fn get_topic_handler(
    State(app_state): State<AppState>,
    Path(topic_id): Path<String>,
    MaybeUser(viewer): MaybeUser,
) -> ApiResult<TopicDetail> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let topic = topics::get_topic(app_state.db(), &topic_id, viewer_id).await?;
    Ok(Json(ApiResponse::data(topic)))
}

async fn text_content(
    app_state: &AppState,
    topic_id: &str,
    viewer: MaybeUser,
    kind: TextKind,
) -> Result<Response, AppError> {
    ensure_topic_access(app_state, topic_id, viewer.0.as_ref()).await?;
    let content = materials::latest_text_content(app_state.db(), topic_id, kind).await?;
    Ok(present_or_empty(content, kind.empty_message()))
}

pub async fn get_notes_handler(
    State(app_state): State<AppState>,
    Path(topic_id): Path<String>,
    viewer: MaybeUser,
) -> Result<Response, AppError> {
    text_content(&app_state, &topic_id, viewer, TextKind::Notes).await
}

pub async fn get_summary_handler(
    State(app_state): State<AppState>,
    Path(topic_id): Path<String>,
    viewer: MaybeUser,
) -> Result<Response, AppError> {
    text_content(&app_state, &topic_id, viewer, TextKind::Summary).await
}

pub async fn get_mind_map_handler(
    State(app_state): State<AppState>,
    Path(topic_id): Path<String>,
    MaybeUser(viewer): MaybeUser,
) -> Result<Response, AppError> {
    ensure_topic_access(&app_state, &topic_id, viewer.as_ref()).await?;
    let mind_map = materials::latest_mind_map(app_state.db(), &topic_id).await?;
    Ok(present_or_empty(
        mind_map,
        "No mind map available for this topic.",
    ))
}

/// `?difficulty=easy|moderate|hard&limit=N`; shuffled on every call.
pub async fn list_mcqs_handler(
    State(app_state): State<AppState>,
    Path(topic_id): Path<String>,
    MaybeUser(viewer): MaybeUser,
    ApiQuery(query): ApiQuery<McqQuery>,
) -> ApiResult<Vec<Mcq>> {
    ensure_topic_access(&app_state, &topic_id, viewer.as_ref()).await?;
    let mcqs = mcqs::list_mcqs(app_state.db(), &topic_id, &query).await?;
    Ok(Json(ApiResponse::data(mcqs)))
}

pub async fn submit_answer_handler(
    State(app_state): State<AppState>,
    Path((topic_id, mcq_id)): Path<(String, String)>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(submission): ApiJson<SubmitAnswer>,
) -> ApiResult<AnswerOutcome> {
    ensure_topic_access(&app_state, &topic_id, Some(&user)).await?;
    let outcome =
        mcqs::submit_answer(app_state.db(), &user.id, &topic_id, &mcq_id, submission).await?;
    Ok(Json(ApiResponse::data(outcome)))
}
