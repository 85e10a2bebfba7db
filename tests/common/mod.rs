#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{multipart, Client, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use notes_api::config::AppConfig;
use notes_api::database::Repositories;
use notes_api::storage::{BlobStorage, LocalDiskStorage};
use notes_api::{app, AppState};

/// One server per test: in-memory persistence and a private upload directory
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub upload_dir: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let upload_dir = tempfile::tempdir().context("failed to create upload dir")?;
        let mut config = AppConfig::for_tests(upload_dir.path());
        config.api.enable_request_logging = false;

        let storage: Arc<dyn BlobStorage> = Arc::new(LocalDiskStorage::new(upload_dir.path()).await?);
        let state = AppState::build(config, Repositories::in_memory(), storage)?;

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: Client::new(),
            upload_dir,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": password,
            }))
            .send()
            .await?)
    }

    /// Registers and returns the bearer token
    pub async fn token_for(&self, username: &str) -> Result<String> {
        let res = self.register(username, "password123").await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("register response carried no token")
    }

    pub async fn create_note(&self, token: &str, title: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/notes"))
            .bearer_auth(token)
            .json(&json!({ "title": title, "content": "body" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create note failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["id"]
            .as_str()
            .map(str::to_string)
            .context("note response carried no id")
    }

    pub async fn upload(&self, token: &str, note_id: &str, parts: Vec<(&str, &str, Vec<u8>)>) -> Result<Response> {
        let mut form = multipart::Form::new();
        for (name, mime, bytes) in parts {
            let part = multipart::Part::bytes(bytes).file_name(name.to_string()).mime_str(mime)?;
            form = form.part("files", part);
        }
        Ok(self
            .client
            .post(self.url(&format!("/api/files/upload/{}", note_id)))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?)
    }

    pub fn stored_file_count(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).map(|d| d.count()).unwrap_or(0)
    }
}
