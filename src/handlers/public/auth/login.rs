// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::State, extract::rejection::JsonRejection, Json};
use serde::Deserialize;

use super::{json_rejection, AuthResponse};
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/login - Authenticate user and receive JWT token
///
/// Unknown usernames and wrong passwords produce the same 401 response.
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(request) = payload.map_err(json_rejection)?;

    let (token, identity) = state.auth.login(request.username.trim(), &request.password).await?;
    Ok(ApiResponse::success(AuthResponse::new(token, identity)))
}
