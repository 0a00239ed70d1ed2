use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use service::branding::domain::{LedgerSummary, VoteDirection, VoteOutcome};

use crate::errors::JsonApiError;
use crate::routes::auth::{CallerIdentity, ServerState};

#[derive(Serialize, Deserialize, Debug)]
pub struct CurrentLogoVoteResponse {
    #[serde(flatten)]
    pub stats: LedgerSummary,
    pub outcome: VoteOutcome,
}

#[utoipa::path(get, path = "/api/current-logo", tag = "current-logo", responses((status = 200, description = "Counters and the caller's standing vote")))]
pub async fn stats(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<LedgerSummary>, JsonApiError> {
    Ok(Json(state.branding.current_logo(caller.identity()).await?))
}

async fn vote(
    state: ServerState,
    caller: CallerIdentity,
    direction: VoteDirection,
) -> Result<Json<CurrentLogoVoteResponse>, JsonApiError> {
    let (stats, outcome) = state.branding.vote_current_logo(caller.identity(), direction).await?;
    Ok(Json(CurrentLogoVoteResponse { stats, outcome }))
}

#[utoipa::path(post, path = "/api/current-logo/like", tag = "current-logo", responses((status = 200, description = "Vote applied"), (status = 401, description = "Unauthorized")))]
pub async fn like(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<CurrentLogoVoteResponse>, JsonApiError> {
    vote(state, caller, VoteDirection::Like).await
}

#[utoipa::path(post, path = "/api/current-logo/dislike", tag = "current-logo", responses((status = 200, description = "Vote applied"), (status = 401, description = "Unauthorized")))]
pub async fn dislike(
    State(state): State<ServerState>,
    caller: CallerIdentity,
) -> Result<Json<CurrentLogoVoteResponse>, JsonApiError> {
    vote(state, caller, VoteDirection::Dislike).await
}
