use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use service::branding::domain::{Submission, SubmissionStatus};

use crate::errors::JsonApiError;
use crate::routes::auth::{CallerIdentity, ServerState};

#[utoipa::path(get, path = "/admin/submissions/pending", tag = "admin", responses((status = 200, description = "Pending submissions, newest first"), (status = 401, description = "Unauthorized"), (status = 403, description = "Forbidden")))]
pub async fn list_pending(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<Submission>>, JsonApiError> {
    Ok(Json(state.branding.list_pending(caller.identity()).await?))
}

#[utoipa::path(get, path = "/admin/submissions/approved", tag = "admin", responses((status = 200, description = "Approved submissions with submitter details"), (status = 403, description = "Forbidden")))]
pub async fn list_approved(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<Submission>>, JsonApiError> {
    Ok(Json(state.branding.admin_list(caller.identity(), SubmissionStatus::Approved).await?))
}

#[utoipa::path(
    post, path = "/admin/submissions/{id}/approve", tag = "admin",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses((status = 200, description = "Approved"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found"), (status = 409, description = "Invalid Transition"))
)]
pub async fn approve(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Submission>, JsonApiError> {
    Ok(Json(state.branding.approve(caller.identity(), id).await?))
}

#[utoipa::path(
    post, path = "/admin/submissions/{id}/reject", tag = "admin",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses((status = 200, description = "Rejected"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found"), (status = 409, description = "Invalid Transition"))
)]
pub async fn reject(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Submission>, JsonApiError> {
    Ok(Json(state.branding.reject(caller.identity(), id).await?))
}
