use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    FileAttachment, NewFileAttachment, NewNote, NewUser, Note, OwnedAttachment, User,
};
use crate::database::repository::{AttachmentRepository, NoteRepository, Persistence, UserRepository};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    notes: HashMap<Uuid, Note>,
    attachments: HashMap<Uuid, FileAttachment>,
    /// Insertion order for attachments, so listings are stable
    attachment_order: Vec<Uuid>,
}

/// Process-local persistence with the same constraints as the Postgres schema.
/// All mutations happen under one write lock, which plays the role of a transaction.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.email == email))
    }

    async fn save(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::UniqueViolation {
                constraint: "users_username_key".to_string(),
            });
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::UniqueViolation {
                constraint: "users_email_key".to_string(),
            });
        }

        let saved = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(saved.id, saved.clone());
        Ok(saved)
    }
}

#[async_trait]
impl NoteRepository for MemoryDatabase {
    async fn find_by_id_and_user_id(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<Note>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .get(&note_id)
            .filter(|n| n.user_id == user_id)
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Note>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut notes: Vec<Note> = tables
            .notes
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    async fn save(&self, note: NewNote) -> Result<Note, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&note.user_id) {
            return Err(DatabaseError::NotFound(format!("user {}", note.user_id)));
        }

        let now = Utc::now();
        let saved = Note {
            id: Uuid::new_v4(),
            user_id: note.user_id,
            title: note.title,
            content: note.content,
            created_at: now,
            updated_at: now,
        };
        tables.notes.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn update(&self, note: Note) -> Result<Note, DatabaseError> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .notes
            .get_mut(&note.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("note {}", note.id)))?;
        existing.title = note.title;
        existing.content = note.content;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, note_id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.notes.remove(&note_id);

        let Tables {
            attachments,
            attachment_order,
            ..
        } = &mut *tables;
        attachments.retain(|_, a| a.note_id != note_id);
        attachment_order.retain(|id| attachments.contains_key(id));
        Ok(())
    }
}

#[async_trait]
impl AttachmentRepository for MemoryDatabase {
    async fn find_by_id(&self, attachment_id: Uuid) -> Result<Option<OwnedAttachment>, DatabaseError> {
        let tables = self.tables.read().await;
        let Some(attachment) = tables.attachments.get(&attachment_id) else {
            return Ok(None);
        };
        Ok(tables.notes.get(&attachment.note_id).map(|note| OwnedAttachment {
            attachment: attachment.clone(),
            owner_id: note.user_id,
        }))
    }

    async fn find_by_note_id(&self, note_id: Uuid) -> Result<Vec<FileAttachment>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attachment_order
            .iter()
            .filter_map(|id| tables.attachments.get(id))
            .filter(|a| a.note_id == note_id)
            .cloned()
            .collect())
    }

    async fn save(&self, attachment: NewFileAttachment) -> Result<FileAttachment, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.notes.contains_key(&attachment.note_id) {
            return Err(DatabaseError::NotFound(format!("note {}", attachment.note_id)));
        }
        if tables.attachments.values().any(|a| a.file_path == attachment.file_path) {
            return Err(DatabaseError::UniqueViolation {
                constraint: "file_attachments_file_path_key".to_string(),
            });
        }

        let saved = FileAttachment {
            id: Uuid::new_v4(),
            note_id: attachment.note_id,
            file_name: attachment.file_name,
            file_type: attachment.file_type,
            file_size: attachment.file_size,
            file_path: attachment.file_path,
            uploaded_at: Utc::now(),
        };
        tables.attachment_order.push(saved.id);
        tables.attachments.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete(&self, attachment_id: Uuid) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.attachments.remove(&attachment_id);
        tables.attachment_order.retain(|id| *id != attachment_id);
        Ok(())
    }
}

#[async_trait]
impl Persistence for MemoryDatabase {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ROLE_USER;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: ROLE_USER.to_string(),
        }
    }

    #[tokio::test]
    async fn enforces_unique_username_and_email() {
        let db = MemoryDatabase::new();
        let users: &dyn UserRepository = &db;

        users.save(new_user("alice", "alice@example.com")).await.unwrap();

        let dup_name = users.save(new_user("alice", "other@example.com")).await.unwrap_err();
        assert!(matches!(dup_name, DatabaseError::UniqueViolation { ref constraint } if constraint == "users_username_key"));

        let dup_email = users.save(new_user("alicia", "alice@example.com")).await.unwrap_err();
        assert!(matches!(dup_email, DatabaseError::UniqueViolation { ref constraint } if constraint == "users_email_key"));

        assert!(users.exists_by_username("alice").await.unwrap());
        assert!(!users.exists_by_username("alicia").await.unwrap());
    }

    #[tokio::test]
    async fn note_lookup_is_scoped_to_owner() {
        let db = MemoryDatabase::new();
        let users: &dyn UserRepository = &db;
        let notes: &dyn NoteRepository = &db;

        let alice = users.save(new_user("alice", "a@example.com")).await.unwrap();
        let bob = users.save(new_user("bob", "b@example.com")).await.unwrap();
        let note = notes
            .save(NewNote {
                user_id: alice.id,
                title: "groceries".to_string(),
                content: None,
            })
            .await
            .unwrap();

        assert!(notes.find_by_id_and_user_id(note.id, alice.id).await.unwrap().is_some());
        assert!(notes.find_by_id_and_user_id(note.id, bob.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_note_removes_its_attachments() {
        let db = MemoryDatabase::new();
        let users: &dyn UserRepository = &db;
        let notes: &dyn NoteRepository = &db;
        let attachments: &dyn AttachmentRepository = &db;

        let alice = users.save(new_user("alice", "a@example.com")).await.unwrap();
        let note = notes
            .save(NewNote {
                user_id: alice.id,
                title: "t".to_string(),
                content: None,
            })
            .await
            .unwrap();
        let saved = attachments
            .save(NewFileAttachment {
                note_id: note.id,
                file_name: "a.txt".to_string(),
                file_type: "text/plain".to_string(),
                file_size: 1,
                file_path: "token.txt".to_string(),
            })
            .await
            .unwrap();

        let owned = attachments.find_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(owned.owner_id, alice.id);

        notes.delete(note.id).await.unwrap();
        assert!(attachments.find_by_id(saved.id).await.unwrap().is_none());
        assert!(attachments.find_by_note_id(note.id).await.unwrap().is_empty());
    }
}
