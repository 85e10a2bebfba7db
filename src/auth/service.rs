use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{PasswordError, PasswordHasher};
use crate::auth::token::{Token, TokenCodec, TokenError};
use crate::database::models::{NewUser, User, ROLE_USER};
use crate::database::{DatabaseError, UserRepository};

/// Minimal identity returned alongside a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserIdentity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// The only component that checks credentials or mints tokens
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    hasher: Arc<PasswordHasher>,
    codec: Arc<TokenCodec>,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<PasswordHasher>, codec: Arc<TokenCodec>) -> Self {
        Self { users, hasher, codec }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<(Token, UserIdentity), AuthError> {
        // Fast rejection only; the unique constraints decide races
        if self.users.exists_by_username(username).await? {
            return Err(AuthError::DuplicateUsername);
        }
        if self.users.exists_by_email(email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hash_password(raw_password).await?;
        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: ROLE_USER.to_string(),
        };

        let saved = self.users.save(new_user).await.map_err(|e| match e {
            DatabaseError::UniqueViolation { constraint } if constraint.contains("email") => {
                AuthError::DuplicateEmail
            }
            DatabaseError::UniqueViolation { .. } => AuthError::DuplicateUsername,
            other => AuthError::Database(other),
        })?;
        info!("Registered user {} ({})", saved.username, saved.id);

        self.login(username, raw_password).await
    }

    pub async fn login(&self, username: &str, raw_password: &str) -> Result<(Token, UserIdentity), AuthError> {
        let user = self.users.find_by_username(username).await?;

        let Some(user) = user else {
            self.burn_verification(raw_password).await;
            warn!("Failed login for {}: no such user", username);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(raw_password, &user.password_hash).await {
            warn!("Failed login for {}: wrong password", username);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.codec.issue_now(&user.username)?;
        info!("User {} logged in", user.username);
        Ok((token, UserIdentity::from(&user)))
    }

    /// Identity behind an already-validated token subject
    pub async fn identity(&self, username: &str) -> Result<UserIdentity, AuthError> {
        self.users
            .find_by_username(username)
            .await?
            .map(|u| UserIdentity::from(&u))
            .ok_or(AuthError::UserNotFound)
    }

    // Argon2 is deliberately slow, so it runs off the async workers

    async fn hash_password(&self, raw_password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let raw = raw_password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&raw))
            .await
            .map_err(|e| PasswordError::Hash(e.to_string()))?
            .map_err(AuthError::from)
    }

    async fn verify_password(&self, raw_password: &str, hash: &str) -> bool {
        let hasher = self.hasher.clone();
        let raw = raw_password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&raw, &hash))
            .await
            .unwrap_or(false)
    }

    async fn burn_verification(&self, raw_password: &str) {
        let hasher = self.hasher.clone();
        let raw = raw_password.to_string();
        let _ = tokio::task::spawn_blocking(move || hasher.verify_dummy(&raw)).await;
    }
}
