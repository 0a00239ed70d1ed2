use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use service::access::Identity;
use service::branding::domain::{LedgerSummary, NewSubmission, Submission, SubmissionStatus, VoteDirection, VoteOutcome};

use crate::errors::JsonApiError;
use crate::routes::auth::{CallerIdentity, ServerState};

/// Public view of a submission: no submitter email, no other voters' keys.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub logo_url: String,
    pub user_name: String,
    pub user_image: Option<String>,
    pub status: SubmissionStatus,
    #[serde(flatten)]
    pub votes: LedgerSummary,
    /// Whether the caller authored this submission.
    pub mine: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionResponse {
    pub fn for_viewer(s: Submission, viewer: Option<&Identity>) -> Self {
        let key = viewer.map(Identity::key);
        let mine = key.as_deref().map_or(false, |k| s.user_email.trim().eq_ignore_ascii_case(k));
        Self {
            votes: s.votes.summary_for(key.as_deref()),
            id: s.id,
            name: s.name,
            description: s.description,
            logo_url: s.logo_url,
            user_name: s.user_name,
            user_image: s.user_image,
            status: s.status,
            mine,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatusResponse {
    pub has_submitted: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SubmissionVoteResponse {
    pub submission: SubmissionResponse,
    pub outcome: VoteOutcome,
}

#[utoipa::path(get, path = "/api/submissions", tag = "submissions", responses((status = 200, description = "Approved submissions, newest first")))]
pub async fn list_approved(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<SubmissionResponse>>, JsonApiError> {
    let items = state.branding.list_approved().await?;
    Ok(Json(
        items
            .into_iter()
            .map(|s| SubmissionResponse::for_viewer(s, caller.identity()))
            .collect(),
    ))
}

#[utoipa::path(
    post, path = "/api/submissions", tag = "submissions",
    request_body = crate::openapi::NewSubmissionDoc,
    responses(
        (status = 201, description = "Created, pending review"),
        (status = 400, description = "Validation Error"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Already Submitted")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Json(input): Json<NewSubmission>,
) -> Result<(StatusCode, Json<SubmissionResponse>), JsonApiError> {
    let created = state.branding.create_submission(caller.identity(), input).await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse::for_viewer(created, caller.identity()))))
}

#[utoipa::path(get, path = "/api/submissions/status", tag = "submissions", responses((status = 200, description = "Whether the caller already submitted"), (status = 401, description = "Unauthorized")))]
pub async fn status(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<SubmissionStatusResponse>, JsonApiError> {
    let has_submitted = state.branding.has_submitted(caller.identity()).await?;
    Ok(Json(SubmissionStatusResponse { has_submitted }))
}

#[utoipa::path(
    get, path = "/api/submissions/{id}", tag = "submissions",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found"))
)]
pub async fn get(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>, JsonApiError> {
    let s = state.branding.get_submission(id).await?;
    Ok(Json(SubmissionResponse::for_viewer(s, caller.identity())))
}

async fn vote(
    state: ServerState,
    caller: CallerIdentity,
    id: Uuid,
    direction: VoteDirection,
) -> Result<Json<SubmissionVoteResponse>, JsonApiError> {
    let (s, outcome) = state.branding.vote(caller.identity(), id, direction).await?;
    Ok(Json(SubmissionVoteResponse { submission: SubmissionResponse::for_viewer(s, caller.identity()), outcome }))
}

#[utoipa::path(
    post, path = "/api/submissions/{id}/like", tag = "submissions",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses((status = 200, description = "Vote applied"), (status = 401, description = "Unauthorized"), (status = 404, description = "Not Found"))
)]
pub async fn like(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionVoteResponse>, JsonApiError> {
    vote(state, caller, id, VoteDirection::Like).await
}

#[utoipa::path(
    post, path = "/api/submissions/{id}/dislike", tag = "submissions",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses((status = 200, description = "Vote applied"), (status = 401, description = "Unauthorized"), (status = 404, description = "Not Found"))
)]
pub async fn dislike(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionVoteResponse>, JsonApiError> {
    vote(state, caller, id, VoteDirection::Dislike).await
}
