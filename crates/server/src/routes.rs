pub mod admin;
pub mod auth;
pub mod current_logo;
pub mod submissions;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::openapi::ApiDoc;
use auth::ServerState;

/// Multipart framing overhead allowed on top of the image size limit.
const MULTIPART_SLACK_BYTES: u64 = 64 * 1024;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> (StatusCode, String) {
    match service::metrics::encode_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}")),
    }
}

/// Build the full application router: public reads, signed-in actions,
/// admin routes, uploaded files and API docs.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let upload_limit = usize::try_from(state.uploads.max_bytes.saturating_add(MULTIPART_SLACK_BYTES)).unwrap_or(usize::MAX);
    let uploads_dir = ServeDir::new(&state.uploads.dir);
    let uploads_prefix = state.uploads.public_prefix.clone();

    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/auth/me", get(auth::me));

    let api = Router::new()
        .route("/api/submissions", get(submissions::list_approved).post(submissions::create))
        .route("/api/submissions/status", get(submissions::status))
        .route("/api/submissions/:id", get(submissions::get))
        .route("/api/submissions/:id/like", post(submissions::like))
        .route("/api/submissions/:id/dislike", post(submissions::dislike))
        .route("/api/current-logo", get(current_logo::stats))
        .route("/api/current-logo/like", post(current_logo::like))
        .route("/api/current-logo/dislike", post(current_logo::dislike))
        .route(
            "/api/uploads",
            post(uploads::upload_logo).layer(DefaultBodyLimit::max(upload_limit)),
        );

    let admin_routes = Router::new()
        .route("/admin/submissions/pending", get(admin::list_pending))
        .route("/admin/submissions/approved", get(admin::list_approved))
        .route("/admin/submissions/:id/approve", post(admin::approve))
        .route("/admin/submissions/:id/reject", post(admin::reject));

    public
        .merge(api)
        .merge(admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service(&uploads_prefix, uploads_dir)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
