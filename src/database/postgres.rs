use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    FileAttachment, NewFileAttachment, NewNote, NewUser, Note, OwnedAttachment, User,
};
use crate::database::repository::{AttachmentRepository, NoteRepository, Persistence, UserRepository};

/// Postgres-backed repositories sharing one pool
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";
const NOTE_COLUMNS: &str = "id, user_id, title, content, created_at, updated_at";

#[async_trait]
impl UserRepository for PgDatabase {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, DatabaseError> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DatabaseError> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn save(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl NoteRepository for PgDatabase {
    async fn find_by_id_and_user_id(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<Note>, DatabaseError> {
        let sql = format!("SELECT {} FROM notes WHERE id = $1 AND user_id = $2", NOTE_COLUMNS);
        Ok(sqlx::query_as::<_, Note>(&sql)
            .bind(note_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Note>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM notes WHERE user_id = $1 ORDER BY updated_at DESC",
            NOTE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Note>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn save(&self, note: NewNote) -> Result<Note, DatabaseError> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO notes (id, user_id, title, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {}",
            NOTE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Note>(&sql)
            .bind(Uuid::new_v4())
            .bind(note.user_id)
            .bind(&note.title)
            .bind(&note.content)
            .bind(now)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, note: Note) -> Result<Note, DatabaseError> {
        let sql = format!(
            "UPDATE notes SET title = $2, content = $3, updated_at = $4 WHERE id = $1 RETURNING {}",
            NOTE_COLUMNS
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(note.id)
            .bind(&note.title)
            .bind(&note.content)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("note {}", note.id)))
    }

    async fn delete(&self, note_id: Uuid) -> Result<(), DatabaseError> {
        // file_attachments rows follow via ON DELETE CASCADE
        sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AttachmentRepository for PgDatabase {
    async fn find_by_id(&self, attachment_id: Uuid) -> Result<Option<OwnedAttachment>, DatabaseError> {
        Ok(sqlx::query_as::<_, OwnedAttachment>(
            "SELECT a.id, a.note_id, a.file_name, a.file_type, a.file_size, a.file_path, a.uploaded_at, \
                    n.user_id AS owner_id \
             FROM file_attachments a JOIN notes n ON n.id = a.note_id \
             WHERE a.id = $1",
        )
        .bind(attachment_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_by_note_id(&self, note_id: Uuid) -> Result<Vec<FileAttachment>, DatabaseError> {
        Ok(sqlx::query_as::<_, FileAttachment>(
            "SELECT id, note_id, file_name, file_type, file_size, file_path, uploaded_at \
             FROM file_attachments WHERE note_id = $1 ORDER BY uploaded_at, id",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save(&self, attachment: NewFileAttachment) -> Result<FileAttachment, DatabaseError> {
        Ok(sqlx::query_as::<_, FileAttachment>(
            "INSERT INTO file_attachments (id, note_id, file_name, file_type, file_size, file_path, uploaded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, note_id, file_name, file_type, file_size, file_path, uploaded_at",
        )
        .bind(Uuid::new_v4())
        .bind(attachment.note_id)
        .bind(&attachment.file_name)
        .bind(&attachment.file_type)
        .bind(attachment.file_size)
        .bind(&attachment.file_path)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete(&self, attachment_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM file_attachments WHERE id = $1")
            .bind(attachment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Persistence for PgDatabase {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
