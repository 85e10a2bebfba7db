use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Extension,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{AttachmentMetadata, UploadedFile};

/// Multipart field carrying file parts; may repeat
pub const FILES_FIELD: &str = "files";

/// POST /api/files/upload/:note_id - attach one or more files to a note
///
/// Empty parts are skipped. The whole batch is stored or none of it is.
pub async fn upload_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Vec<AttachmentMetadata>> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        files.push(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let stored = state
        .attachments
        .store_many(files, note_id, &user.username)
        .await?;
    Ok(ApiResponse::created(stored))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::bad_request(err.body_text())
    }
}
