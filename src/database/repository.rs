use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    FileAttachment, NewFileAttachment, NewNote, NewUser, Note, OwnedAttachment, User,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, DatabaseError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, DatabaseError>;

    /// Fails with `UniqueViolation` when username or email is taken
    async fn save(&self, user: NewUser) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Only returns the note when it belongs to `user_id`
    async fn find_by_id_and_user_id(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<Note>, DatabaseError>;

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Note>, DatabaseError>;

    async fn save(&self, note: NewNote) -> Result<Note, DatabaseError>;

    async fn update(&self, note: Note) -> Result<Note, DatabaseError>;

    /// Removes the note and its attachment rows
    async fn delete(&self, note_id: Uuid) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    async fn find_by_id(&self, attachment_id: Uuid) -> Result<Option<OwnedAttachment>, DatabaseError>;

    async fn find_by_note_id(&self, note_id: Uuid) -> Result<Vec<FileAttachment>, DatabaseError>;

    async fn save(&self, attachment: NewFileAttachment) -> Result<FileAttachment, DatabaseError>;

    async fn delete(&self, attachment_id: Uuid) -> Result<(), DatabaseError>;
}

/// A backend providing all three repositories
#[async_trait]
pub trait Persistence: UserRepository + NoteRepository + AttachmentRepository {
    async fn health_check(&self) -> Result<(), DatabaseError>;
}
