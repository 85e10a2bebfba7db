// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints. Both return the same body shape:
//
// ```json
// {
//   "success": true,
//   "data": {
//     "token": "eyJhbGciOiJIUzI1NiI...",
//     "type": "Bearer",
//     "user_id": "uuid",
//     "username": "alice",
//     "email": "alice@example.com",
//     "expires_at": "2025-01-01T00:00:00Z"
//   }
// }
// ```

use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{Token, UserIdentity};
use crate::error::ApiError;

pub mod login;    // POST /api/auth/login - authenticate and get JWT
pub mod register; // POST /api/auth/register - create account and get JWT

pub use login::login_post;
pub use register::register_post;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthResponse {
    pub fn new(token: Token, identity: UserIdentity) -> Self {
        Self {
            token: token.value,
            token_type: "Bearer",
            user_id: identity.id,
            username: identity.username,
            email: identity.email,
            expires_at: token.expires_at,
        }
    }
}

pub(crate) fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}
