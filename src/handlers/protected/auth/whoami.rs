use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::auth::UserIdentity;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/auth/whoami - identity behind the presented token
pub async fn whoami_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<UserIdentity> {
    let identity = state.auth.identity(&user.username).await?;
    Ok(ApiResponse::success(identity))
}
