use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// DELETE /api/files/:id - remove stored content, then the attachment record
pub async fn file_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.attachments.delete(id, &user.username).await?;
    Ok(ApiResponse::success(json!({ "message": "File deleted successfully" })))
}
