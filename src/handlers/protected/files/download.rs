use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// GET /api/files/:id - stream the stored content back as a download
pub async fn file_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let file = state.attachments.retrieve(id, &user.username).await?;

    let disposition = content_disposition(&file.metadata.file_name);
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, file.content).into_response())
}

/// `attachment; filename="<name>"` with anything that could break the quoted string replaced.
/// Names that needed replacing also get an RFC 5987 `filename*` carrying the exact UTF-8 name.
fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let value = if safe == file_name {
        format!("attachment; filename=\"{}\"", safe)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            safe,
            urlencoding::encode(file_name)
        )
    };

    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
