// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::{extract::State, extract::rejection::JsonRejection, Json};
use serde::Deserialize;

use super::{json_rejection, AuthResponse};
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let username = self.username.trim();
        if !USERNAME_LEN.contains(&username.chars().count()) {
            return Err(ApiError::validation_error(format!(
                "Username must be between {} and {} characters",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            )));
        }

        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
            .unwrap_or(false);
        if !well_formed || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
            return Err(ApiError::validation_error("Email must be a valid address"));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation_error(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

/// POST /api/auth/register - Create an account and log it in
///
/// Returns 201 with a token, 409 when the username or email is taken.
pub async fn register_post(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate()?;

    let (token, identity) = state
        .auth
        .register(request.username.trim(), request.email.trim(), &request.password)
        .await?;
    Ok(ApiResponse::created(AuthResponse::new(token, identity)))
}
