use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};

use crate::app::AppState;
use crate::handlers::public::auth::json_rejection;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{NoteInput, NoteView};

pub async fn notes_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<NoteView>> {
    let notes = state.notes.list(&user.username).await?;
    Ok(ApiResponse::success(notes))
}

pub async fn notes_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> ApiResult<NoteView> {
    let Json(input) = payload.map_err(json_rejection)?;
    let note = state.notes.create(&user.username, input).await?;
    Ok(ApiResponse::created(note))
}
