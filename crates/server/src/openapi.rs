use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmissionDoc {
    pub name: String,
    pub description: String,
    /// Reference returned by `POST /api/uploads`
    pub logo_url: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::me,
        crate::routes::submissions::list_approved,
        crate::routes::submissions::create,
        crate::routes::submissions::status,
        crate::routes::submissions::get,
        crate::routes::submissions::like,
        crate::routes::submissions::dislike,
        crate::routes::current_logo::stats,
        crate::routes::current_logo::like,
        crate::routes::current_logo::dislike,
        crate::routes::uploads::upload_logo,
        crate::routes::admin::list_pending,
        crate::routes::admin::list_approved,
        crate::routes::admin::approve,
        crate::routes::admin::reject,
    ),
    components(
        schemas(
            HealthResponse,
            NewSubmissionDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "submissions"),
        (name = "current-logo"),
        (name = "uploads"),
        (name = "admin")
    )
)]
pub struct ApiDoc;
