use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use service::uploads::LogoUpload;

use crate::errors::JsonApiError;
use crate::routes::auth::{CallerIdentity, ServerState};

/// Multipart form field carrying the image.
pub const FILE_FIELD: &str = "file";

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutput {
    pub success: bool,
    /// Reference to place in a submission's `logoUrl`.
    pub file_name: String,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> JsonApiError {
    warn!(err = %e, "multipart read failed");
    let status = e.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        JsonApiError::new(status, "File Too Large", Some(e.body_text()))
    } else {
        JsonApiError::bad_request(e.body_text())
    }
}

#[utoipa::path(
    post, path = "/api/uploads", tag = "uploads",
    responses(
        (status = 200, description = "Stored"),
        (status = 400, description = "No file uploaded"),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "File Too Large"),
        (status = 415, description = "Invalid File Type")
    )
)]
pub async fn upload_logo(
    State(state): State<ServerState>,
    caller: CallerIdentity,
    mut multipart: Multipart,
) -> Result<Json<UploadOutput>, JsonApiError> {
    state.branding.gate().require_user(caller.identity())?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let upload = LogoUpload { file_name, content_type, bytes: bytes.to_vec() };
        let file_name = state.logos.store(upload).await?;
        return Ok(Json(UploadOutput { success: true, file_name }));
    }

    Err(JsonApiError::bad_request("No file uploaded"))
}
