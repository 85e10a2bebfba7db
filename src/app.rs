use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{Authenticator, PasswordHasher, TokenCodec};
use crate::config::AppConfig;
use crate::database::Repositories;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{AttachmentStore, NoteService};
use crate::storage::BlobStorage;

/// Everything a handler may touch, passed explicitly through axum state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub codec: Arc<TokenCodec>,
    pub auth: Arc<Authenticator>,
    pub notes: Arc<NoteService>,
    pub attachments: Arc<AttachmentStore>,
    pub repos: Repositories,
}

impl AppState {
    pub fn build(config: AppConfig, repos: Repositories, storage: Arc<dyn BlobStorage>) -> Result<Self> {
        let codec = Arc::new(TokenCodec::from_config(&config.security).context("invalid JWT_SECRET")?);
        let hasher = Arc::new(PasswordHasher::new(config.security.password).context("invalid argon2 parameters")?);

        let auth = Authenticator::new(repos.users.clone(), hasher, codec.clone());
        let notes = NoteService::new(&repos, storage.clone());
        let attachments = AttachmentStore::new(&repos, storage, &config.storage);

        Ok(Self {
            config: Arc::new(config),
            codec,
            auth: Arc::new(auth),
            notes: Arc::new(notes),
            attachments: Arc::new(attachments),
            repos,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config));

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/login", post(auth::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, files, notes};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami_get))
        .route("/api/notes", get(notes::notes_get).post(notes::notes_post))
        .route(
            "/api/notes/:id",
            get(notes::note_get).put(notes::note_put).delete(notes::note_delete),
        )
        .route("/api/files/upload/:note_id", post(files::upload_post))
        .route("/api/files/:id", get(files::file_get).delete(files::file_delete))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

async fn root() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Notes API (Rust)",
            "version": version,
            "description": "Notes backend with per-user file attachments",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/api/auth/register, /api/auth/login (public - token acquisition)",
                "auth": "/api/auth/whoami (protected)",
                "notes": "/api/notes[/:id] (protected)",
                "files": "/api/files/upload/:note_id, /api/files/:id (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if let Err(e) = state.repos.backend.health_check().await {
        tracing::error!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("Database unavailable"));
    }

    Ok(Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "database": "ok"
        }
    })))
}
