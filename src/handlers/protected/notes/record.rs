use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::handlers::public::auth::json_rejection;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{NoteInput, NoteView};

pub async fn note_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<NoteView> {
    let note = state.notes.get(id, &user.username).await?;
    Ok(ApiResponse::success(note))
}

pub async fn note_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> ApiResult<NoteView> {
    let Json(input) = payload.map_err(json_rejection)?;
    let note = state.notes.update(id, &user.username, input).await?;
    Ok(ApiResponse::success(note))
}

pub async fn note_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.notes.delete(id, &user.username).await?;
    Ok(ApiResponse::success(json!({ "message": "Note deleted successfully" })))
}
