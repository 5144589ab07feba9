use super::{
    auth::gate::require_route_policy,
    errors::{expose_error_details, route_not_found},
    handlers,
    rate_limit::rate_limit,
    state::AppState,
};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

/// Administrative routes. Each one must be listed in the role policy table;
/// the layer checks the matched pattern against it.
fn admin_routes(app_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/tracks", post(handlers::create_track_handler))
        .route(
            "/api/admin/tracks/{id}",
            put(handlers::update_track_handler).delete(handlers::delete_track_handler),
        )
        .route("/api/admin/subjects", post(handlers::create_subject_handler))
        .route(
            "/api/admin/subjects/{id}",
            put(handlers::update_subject_handler).delete(handlers::delete_subject_handler),
        )
        .route("/api/admin/topics", post(handlers::create_topic_handler))
        .route(
            "/api/admin/topics/{id}",
            put(handlers::update_topic_handler).delete(handlers::delete_topic_handler),
        )
        .route(
            "/api/admin/topics/{id}/notes",
            post(handlers::create_notes_handler),
        )
        .route(
            "/api/admin/topics/{id}/summary",
            post(handlers::create_summary_handler),
        )
        .route(
            "/api/admin/topics/{id}/mindmap",
            post(handlers::create_mind_map_handler),
        )
        .route("/api/admin/mcqs", post(handlers::create_mcq_handler))
        .route("/api/admin/mcqs/bulk", post(handlers::create_mcqs_bulk_handler))
        .route(
            "/api/admin/mcqs/{id}",
            put(handlers::update_mcq_handler).delete(handlers::delete_mcq_handler),
        )
        .route("/api/admin/users", get(handlers::list_users_handler))
        .route("/api/admin/users/{id}", put(handlers::update_user_handler))
        .route_layer(from_fn_with_state(app_state.clone(), require_route_policy))
}

fn api_routes(app_state: &AppState) -> Router<AppState> {
    Router::new()
        // Auth
        .route("/api/auth/register", post(handlers::register_handler))
        .route("/api/auth/login", post(handlers::login_handler))
        .route("/api/auth/verify-otp", post(handlers::verify_otp_handler))
        .route("/api/auth/resend-otp", post(handlers::resend_otp_handler))
        .route(
            "/api/auth/refresh-token",
            post(handlers::refresh_token_handler),
        )
        .route("/api/auth/me", get(handlers::me_handler))
        .route("/api/auth/logout", post(handlers::logout_handler))
        // Content
        .route("/api/tracks", get(handlers::list_tracks_handler))
        .route("/api/tracks/{id}", get(handlers::get_track_handler))
        .route(
            "/api/tracks/{id}/subjects",
            get(handlers::list_track_subjects_handler),
        )
        .route("/api/subjects/{id}", get(handlers::get_subject_handler))
        .route(
            "/api/subjects/{id}/topics",
            get(handlers::list_subject_topics_handler),
        )
        .route("/api/topics/{id}", get(handlers::get_topic_handler))
        .route("/api/topics/{id}/notes", get(handlers::get_notes_handler))
        .route(
            "/api/topics/{id}/summary",
            get(handlers::get_summary_handler),
        )
        .route(
            "/api/topics/{id}/mindmap",
            get(handlers::get_mind_map_handler),
        )
        .route("/api/topics/{id}/mcqs", get(handlers::list_mcqs_handler))
        .route(
            "/api/topics/{id}/mcqs/{mcq_id}/submit",
            post(handlers::submit_answer_handler),
        )
        // Learner state
        .route(
            "/api/users/preferences",
            get(handlers::get_preferences_handler).put(handlers::update_preferences_handler),
        )
        .route(
            "/api/users/bookmarks",
            get(handlers::list_bookmarks_handler).post(handlers::add_bookmark_handler),
        )
        .route(
            "/api/users/bookmarks/{topic_id}",
            delete(handlers::remove_bookmark_handler),
        )
        .route("/api/users/analytics", get(handlers::analytics_handler))
        // Subscriptions
        .route(
            "/api/subscriptions/plans",
            get(handlers::list_plans_handler),
        )
        .route(
            "/api/subscriptions/my-subscription",
            get(handlers::my_subscription_handler),
        )
        .route(
            "/api/subscriptions/create",
            post(handlers::create_subscription_handler),
        )
        .route(
            "/api/subscriptions/cancel",
            post(handlers::cancel_subscription_handler),
        )
        .merge(admin_routes(app_state))
        .route_layer(from_fn_with_state(app_state.clone(), rate_limit))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, "Ignoring unusable CORS origin: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    let config = app_state.config.clone();

    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .merge(api_routes(&app_state))
        .fallback(route_not_found)
        .with_state(app_state);

    if config.is_development() {
        router = router.layer(from_fn(expose_error_details));
    }

    router
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
