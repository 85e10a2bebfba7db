use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{NewNote, Note, User};
use crate::database::{AttachmentRepository, DatabaseError, NoteRepository, Repositories, UserRepository};
use crate::services::attachment_service::AttachmentMetadata;
use crate::storage::BlobStorage;

pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct NoteInput {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteView {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_attachments: Vec<AttachmentMetadata>,
}

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("User not found")]
    UserNotFound,

    #[error("Note not found or access denied")]
    NotFoundOrDenied,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to remove attachment content: {0}")]
    Storage(#[source] io::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Owner-scoped note CRUD
pub struct NoteService {
    users: Arc<dyn UserRepository>,
    notes: Arc<dyn NoteRepository>,
    attachments: Arc<dyn AttachmentRepository>,
    storage: Arc<dyn BlobStorage>,
}

impl NoteService {
    pub fn new(repos: &Repositories, storage: Arc<dyn BlobStorage>) -> Self {
        Self {
            users: repos.users.clone(),
            notes: repos.notes.clone(),
            attachments: repos.attachments.clone(),
            storage,
        }
    }

    pub async fn create(&self, username: &str, input: NoteInput) -> Result<NoteView, NoteError> {
        let input = validate(input)?;
        let user = self.resolve_user(username).await?;
        let note = self
            .notes
            .save(NewNote {
                user_id: user.id,
                title: input.title,
                content: input.content,
            })
            .await?;
        info!("Created note {} for {}", note.id, username);
        Ok(self.view(note, Vec::new()))
    }

    pub async fn list(&self, username: &str) -> Result<Vec<NoteView>, NoteError> {
        let user = self.resolve_user(username).await?;
        let notes = self.notes.find_by_user_id(user.id).await?;

        let mut views = Vec::with_capacity(notes.len());
        for note in notes {
            views.push(self.with_attachments(note).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, note_id: Uuid, username: &str) -> Result<NoteView, NoteError> {
        let note = self.resolve_note(note_id, username).await?;
        self.with_attachments(note).await
    }

    pub async fn update(&self, note_id: Uuid, username: &str, input: NoteInput) -> Result<NoteView, NoteError> {
        let input = validate(input)?;
        let mut note = self.resolve_note(note_id, username).await?;
        note.title = input.title;
        note.content = input.content;

        let updated = self.notes.update(note).await?;
        self.with_attachments(updated).await
    }

    /// Removes each attachment (content, then row), then the note.
    /// A storage failure stops the delete and leaves the note and any remaining attachments in place.
    pub async fn delete(&self, note_id: Uuid, username: &str) -> Result<(), NoteError> {
        let note = self.resolve_note(note_id, username).await?;

        for attachment in self.attachments.find_by_note_id(note.id).await? {
            if let Err(e) = self.storage.delete_bytes(&attachment.file_path).await {
                warn!("Keeping note {}: content of attachment {} could not be removed", note.id, attachment.id);
                return Err(NoteError::Storage(e));
            }
            self.attachments.delete(attachment.id).await?;
        }
        self.notes.delete(note.id).await?;

        info!("Deleted note {} for {}", note.id, username);
        Ok(())
    }

    async fn resolve_user(&self, username: &str) -> Result<User, NoteError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(NoteError::UserNotFound)
    }

    async fn resolve_note(&self, note_id: Uuid, username: &str) -> Result<Note, NoteError> {
        let user = self.resolve_user(username).await?;
        self.notes
            .find_by_id_and_user_id(note_id, user.id)
            .await?
            .ok_or(NoteError::NotFoundOrDenied)
    }

    async fn with_attachments(&self, note: Note) -> Result<NoteView, NoteError> {
        let attachments = self.attachments.find_by_note_id(note.id).await?;
        let metadata = attachments.iter().map(AttachmentMetadata::from).collect();
        Ok(self.view(note, metadata))
    }

    fn view(&self, note: Note, file_attachments: Vec<AttachmentMetadata>) -> NoteView {
        NoteView {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: note.created_at,
            updated_at: note.updated_at,
            file_attachments,
        }
    }
}

fn validate(input: NoteInput) -> Result<NoteInput, NoteError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(NoteError::InvalidInput("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(NoteError::InvalidInput(format!(
            "Title must not exceed {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(NoteInput {
        title: title.to_string(),
        content: input.content,
    })
}
