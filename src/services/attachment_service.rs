use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::database::models::{FileAttachment, NewFileAttachment, Note, OwnedAttachment, User};
use crate::database::{AttachmentRepository, DatabaseError, NoteRepository, Repositories, UserRepository};
use crate::storage::BlobStorage;

/// Longest extension carried over onto a storage token
const MAX_EXTENSION_LEN: usize = 16;

/// Column width of `file_attachments.file_name`, in characters
pub const MAX_FILE_NAME_LEN: usize = 255;

/// One uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: Some(content_type.into()),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Client-facing attachment description; the storage token is deliberately absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&FileAttachment> for AttachmentMetadata {
    fn from(a: &FileAttachment) -> Self {
        Self {
            id: a.id,
            file_name: a.file_name.clone(),
            file_type: a.file_type.clone(),
            file_size: a.file_size,
            uploaded_at: a.uploaded_at,
        }
    }
}

/// Content plus the metadata needed to serve it
#[derive(Debug, Clone)]
pub struct RetrievedFile {
    pub metadata: AttachmentMetadata,
    pub content: Vec<u8>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("File is empty")]
    EmptyFile,

    #[error("File size {size} bytes exceeds maximum limit of {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File type '{0}' not allowed. Allowed types: PDF, images, text files, Word documents")]
    UnsupportedType(String),
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("User not found")]
    UserNotFound,

    #[error("Note not found or access denied")]
    NoteNotFoundOrDenied,

    #[error("File not found")]
    FileNotFound,

    #[error("Access denied")]
    AccessDenied,

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("No valid files were uploaded")]
    NoValidFiles,

    #[error("Could not {action} file")]
    Storage {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Validates, stores, serves and deletes attachment bytes.
/// Every operation walks User -> Note -> FileAttachment before touching storage.
pub struct AttachmentStore {
    users: Arc<dyn UserRepository>,
    notes: Arc<dyn NoteRepository>,
    attachments: Arc<dyn AttachmentRepository>,
    storage: Arc<dyn BlobStorage>,
    max_file_size: u64,
    allowed_types: Vec<String>,
}

impl AttachmentStore {
    pub fn new(repos: &Repositories, storage: Arc<dyn BlobStorage>, config: &StorageConfig) -> Self {
        Self {
            users: repos.users.clone(),
            notes: repos.notes.clone(),
            attachments: repos.attachments.clone(),
            storage,
            max_file_size: config.max_file_size,
            allowed_types: config.allowed_types.iter().map(|t| t.to_ascii_lowercase()).collect(),
        }
    }

    pub async fn store(
        &self,
        file: UploadedFile,
        note_id: Uuid,
        username: &str,
    ) -> Result<AttachmentMetadata, AttachmentError> {
        let (_, note) = self.resolve_note(note_id, username).await?;
        let file_type = self.validate(&file)?;
        let saved = self.persist(&file, file_type, &note).await?;

        info!(
            "Stored attachment {} ({} bytes) on note {} for {}",
            saved.id, saved.file_size, note.id, username
        );
        Ok(AttachmentMetadata::from(&saved))
    }

    /// Store every non-empty file, all or nothing.
    ///
    /// Empty entries are skipped. All remaining entries are validated before any
    /// byte is written; if a write fails partway, the attachments already written
    /// by this call are removed again before the error is returned.
    pub async fn store_many(
        &self,
        files: Vec<UploadedFile>,
        note_id: Uuid,
        username: &str,
    ) -> Result<Vec<AttachmentMetadata>, AttachmentError> {
        let candidates: Vec<UploadedFile> = files.into_iter().filter(|f| !f.is_empty()).collect();
        if candidates.is_empty() {
            return Err(AttachmentError::NoValidFiles);
        }

        let (_, note) = self.resolve_note(note_id, username).await?;

        let mut validated = Vec::with_capacity(candidates.len());
        for file in &candidates {
            validated.push((file, self.validate(file)?));
        }

        let mut stored: Vec<FileAttachment> = Vec::with_capacity(validated.len());
        for (file, file_type) in validated {
            match self.persist(file, file_type, &note).await {
                Ok(saved) => stored.push(saved),
                Err(e) => {
                    warn!(
                        "Upload to note {} failed after {} file(s); rolling back",
                        note.id,
                        stored.len()
                    );
                    self.roll_back(&stored).await;
                    return Err(e);
                }
            }
        }

        info!("Stored {} attachment(s) on note {} for {}", stored.len(), note.id, username);
        Ok(stored.iter().map(AttachmentMetadata::from).collect())
    }

    pub async fn retrieve(&self, attachment_id: Uuid, username: &str) -> Result<RetrievedFile, AttachmentError> {
        let owned = self.resolve_and_authorize(attachment_id, username).await?;
        let attachment = owned.attachment;

        let present = self
            .storage
            .exists(&attachment.file_path)
            .await
            .map_err(|e| AttachmentError::Storage { action: "read", source: e })?;

        if !present {
            return Err(self.missing_content(&attachment));
        }

        let content = match self.storage.read_bytes(&attachment.file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(self.missing_content(&attachment)),
            Err(e) => {
                error!("Failed to read attachment {}: {}", attachment.id, e);
                return Err(AttachmentError::Storage { action: "read", source: e });
            }
        };

        Ok(RetrievedFile {
            metadata: AttachmentMetadata::from(&attachment),
            content,
        })
    }

    pub async fn delete(&self, attachment_id: Uuid, username: &str) -> Result<(), AttachmentError> {
        let owned = self.resolve_and_authorize(attachment_id, username).await?;
        let attachment = owned.attachment;

        // Bytes first; metadata only goes once the object is gone
        self.storage
            .delete_bytes(&attachment.file_path)
            .await
            .map_err(|e| {
                error!("Failed to delete content of attachment {}: {}", attachment.id, e);
                AttachmentError::Storage { action: "delete", source: e }
            })?;
        self.attachments.delete(attachment.id).await?;

        info!("Deleted attachment {} for {}", attachment.id, username);
        Ok(())
    }

    /// Metadata exists but the stored object does not
    fn missing_content(&self, attachment: &FileAttachment) -> AttachmentError {
        error!(
            "Attachment {} has metadata but no stored content",
            attachment.id
        );
        AttachmentError::FileNotFound
    }

    async fn resolve_user(&self, username: &str) -> Result<User, AttachmentError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(AttachmentError::UserNotFound)
    }

    async fn resolve_note(&self, note_id: Uuid, username: &str) -> Result<(User, Note), AttachmentError> {
        let user = self.resolve_user(username).await?;
        let note = self
            .notes
            .find_by_id_and_user_id(note_id, user.id)
            .await?
            .ok_or(AttachmentError::NoteNotFoundOrDenied)?;
        Ok((user, note))
    }

    /// Shared ownership gate for retrieve and delete
    async fn resolve_and_authorize(&self, attachment_id: Uuid, username: &str) -> Result<OwnedAttachment, AttachmentError> {
        let user = self.resolve_user(username).await?;
        let owned = self
            .attachments
            .find_by_id(attachment_id)
            .await?
            .ok_or_else(|| {
                warn!("Attachment {} requested by {} does not exist", attachment_id, username);
                AttachmentError::FileNotFound
            })?;

        if owned.owner_id != user.id {
            warn!("Attachment {} requested by {} who does not own it", attachment_id, username);
            return Err(AttachmentError::AccessDenied);
        }
        Ok(owned)
    }

    /// Returns the normalized MIME type on success
    fn validate(&self, file: &UploadedFile) -> Result<String, ValidationFailure> {
        if file.is_empty() {
            return Err(ValidationFailure::EmptyFile);
        }
        if file.size() > self.max_file_size {
            return Err(ValidationFailure::FileTooLarge {
                size: file.size(),
                max: self.max_file_size,
            });
        }

        let declared = file.content_type.as_deref().unwrap_or_default();
        let essence = mime_essence(declared);
        if !self.allowed_types.iter().any(|t| *t == essence) {
            return Err(ValidationFailure::UnsupportedType(declared.to_string()));
        }
        Ok(essence)
    }

    /// Write bytes under a fresh token, then record metadata
    async fn persist(&self, file: &UploadedFile, file_type: String, note: &Note) -> Result<FileAttachment, AttachmentError> {
        let token = storage_token(&file.file_name);

        self.storage.write_bytes(&token, &file.bytes).await.map_err(|e| {
            error!("Failed to write attachment content for note {}: {}", note.id, e);
            AttachmentError::Storage { action: "store", source: e }
        })?;

        let record = NewFileAttachment {
            note_id: note.id,
            file_name: original_name(&file.file_name),
            file_type,
            file_size: file.size() as i64,
            file_path: token.clone(),
        };

        match self.attachments.save(record).await {
            Ok(saved) => Ok(saved),
            Err(e) => {
                // Metadata failed, so the bytes would be unreachable
                if let Err(cleanup) = self.storage.delete_bytes(&token).await {
                    error!("Failed to remove orphaned content after metadata error: {}", cleanup);
                }
                Err(e.into())
            }
        }
    }

    async fn roll_back(&self, stored: &[FileAttachment]) {
        for attachment in stored {
            if let Err(e) = self.storage.delete_bytes(&attachment.file_path).await {
                error!("Rollback could not remove content of {}: {}", attachment.id, e);
            }
            if let Err(e) = self.attachments.delete(attachment.id).await {
                error!("Rollback could not remove metadata of {}: {}", attachment.id, e);
            }
        }
    }
}

/// `text/plain; charset=utf-8` -> `text/plain`
fn mime_essence(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Final path component of the client-supplied name, shortened to fit the column
fn original_name(declared: &str) -> String {
    let normalized = declared.replace('\\', "/");
    let name = normalized.rsplit('/').next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        return "file".to_string();
    }
    if name.chars().count() <= MAX_FILE_NAME_LEN {
        return name.to_string();
    }

    // Keep a short extension and cut the stem
    let extension = name
        .rfind('.')
        .filter(|&dot| dot > 0)
        .map(|dot| &name[dot..])
        .filter(|ext| ext.chars().count() <= MAX_EXTENSION_LEN + 1)
        .unwrap_or("");
    let stem_len = MAX_FILE_NAME_LEN - extension.chars().count();
    let stem: String = name[..name.len() - extension.len()].chars().take(stem_len).collect();
    format!("{}{}", stem, extension)
}

/// Random name for durable storage. Only a short alphanumeric extension survives from the client name.
fn storage_token(declared: &str) -> String {
    let id = Uuid::new_v4();
    let extension = Path::new(&original_name(declared))
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= MAX_EXTENSION_LEN)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewNote, NewUser, ROLE_USER};
    use crate::database::MemoryDatabase;
    use crate::storage::LocalDiskStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Fixture {
        store: AttachmentStore,
        repos: Repositories,
        storage: Arc<LocalDiskStorage>,
        _tmp: TempDir,
    }

    async fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalDiskStorage::new(tmp.path()).await.unwrap());
        fixture_with(tmp, storage.clone(), storage).await
    }

    async fn fixture_with(tmp: TempDir, disk: Arc<LocalDiskStorage>, storage: Arc<dyn BlobStorage>) -> Fixture {
        let repos = Repositories::from_backend(Arc::new(MemoryDatabase::new()));
        let config = StorageConfig::new(tmp.path());
        Fixture {
            store: AttachmentStore::new(&repos, storage, &config),
            repos,
            storage: disk,
            _tmp: tmp,
        }
    }

    async fn user_with_note(repos: &Repositories, username: &str) -> (User, Note) {
        let user = repos
            .users
            .save(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "unused".to_string(),
                role: ROLE_USER.to_string(),
            })
            .await
            .unwrap();
        let note = repos
            .notes
            .save(NewNote {
                user_id: user.id,
                title: format!("{}'s note", username),
                content: None,
            })
            .await
            .unwrap();
        (user, note)
    }

    fn text_file(name: &str, len: usize) -> UploadedFile {
        UploadedFile::new(name, "text/plain", vec![b'x'; len])
    }

    fn files_on_disk(storage: &LocalDiskStorage) -> usize {
        std::fs::read_dir(storage.root()).unwrap().count()
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;
        let content: Vec<u8> = (0..5120u32).map(|i| (i % 251) as u8).collect();

        let meta = f
            .store
            .store(UploadedFile::new("notes.txt", "text/plain", content.clone()), note.id, "alice")
            .await
            .unwrap();
        assert_eq!(meta.file_name, "notes.txt");
        assert_eq!(meta.file_size, 5120);
        assert_eq!(meta.file_type, "text/plain");

        let retrieved = f.store.retrieve(meta.id, "alice").await.unwrap();
        assert_eq!(retrieved.content, content);
        assert_eq!(retrieved.metadata, meta);
    }

    #[tokio::test]
    async fn storage_token_is_independent_of_client_name() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;

        let meta = f
            .store
            .store(text_file("../../etc/passwd.txt", 10), note.id, "alice")
            .await
            .unwrap();
        assert_eq!(meta.file_name, "passwd.txt");

        let owned = f.repos.attachments.find_by_id(meta.id).await.unwrap().unwrap();
        let token = owned.attachment.file_path;
        assert!(token.ends_with(".txt"));
        assert!(!token.contains("passwd"));
        assert!(Uuid::parse_str(token.trim_end_matches(".txt")).is_ok());
        assert!(f.storage.root().join(&token).exists());
    }

    #[tokio::test]
    async fn rejects_invalid_files_with_specific_reasons() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;

        let empty = f.store.store(text_file("a.txt", 0), note.id, "alice").await.unwrap_err();
        assert!(matches!(empty, AttachmentError::Validation(ValidationFailure::EmptyFile)));

        let big = f
            .store
            .store(text_file("big.txt", 10 * 1024 * 1024 + 1), note.id, "alice")
            .await
            .unwrap_err();
        assert!(matches!(
            big,
            AttachmentError::Validation(ValidationFailure::FileTooLarge { size, max })
                if size == 10 * 1024 * 1024 + 1 && max == 10 * 1024 * 1024
        ));

        let exe = f
            .store
            .store(UploadedFile::new("run.exe", "application/x-msdownload", vec![1]), note.id, "alice")
            .await
            .unwrap_err();
        assert!(matches!(exe, AttachmentError::Validation(ValidationFailure::UnsupportedType(ref t)) if t == "application/x-msdownload"));

        let untyped = UploadedFile {
            file_name: "x.txt".to_string(),
            content_type: None,
            bytes: vec![1],
        };
        assert!(matches!(
            f.store.store(untyped, note.id, "alice").await.unwrap_err(),
            AttachmentError::Validation(ValidationFailure::UnsupportedType(_))
        ));

        assert_eq!(files_on_disk(&f.storage), 0);
    }

    #[tokio::test]
    async fn accepts_exact_limit_and_mime_parameters() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;

        let at_limit = UploadedFile::new("max.pdf", "application/pdf", vec![0; 10 * 1024 * 1024]);
        assert!(f.store.store(at_limit, note.id, "alice").await.is_ok());

        let with_charset = UploadedFile::new("a.txt", "Text/Plain; charset=utf-8", vec![b'a']);
        let meta = f.store.store(with_charset, note.id, "alice").await.unwrap();
        assert_eq!(meta.file_type, "text/plain");
    }

    #[tokio::test]
    async fn store_requires_note_owned_by_requester() {
        let f = fixture().await;
        let (_, alice_note) = user_with_note(&f.repos, "alice").await;
        user_with_note(&f.repos, "bob").await;

        let err = f.store.store(text_file("a.txt", 3), alice_note.id, "bob").await.unwrap_err();
        assert!(matches!(err, AttachmentError::NoteNotFoundOrDenied));

        let err = f.store.store(text_file("a.txt", 3), Uuid::new_v4(), "alice").await.unwrap_err();
        assert!(matches!(err, AttachmentError::NoteNotFoundOrDenied));

        let err = f.store.store(text_file("a.txt", 3), alice_note.id, "nobody").await.unwrap_err();
        assert!(matches!(err, AttachmentError::UserNotFound));
    }

    #[tokio::test]
    async fn other_users_cannot_retrieve_or_delete() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;
        user_with_note(&f.repos, "bob").await;

        let meta = f.store.store(text_file("notes.txt", 5120), note.id, "alice").await.unwrap();

        assert!(matches!(
            f.store.retrieve(meta.id, "bob").await.unwrap_err(),
            AttachmentError::AccessDenied
        ));
        assert!(matches!(
            f.store.delete(meta.id, "bob").await.unwrap_err(),
            AttachmentError::AccessDenied
        ));
        assert!(matches!(
            f.store.retrieve(Uuid::new_v4(), "alice").await.unwrap_err(),
            AttachmentError::FileNotFound
        ));

        // still intact for the owner
        assert_eq!(f.store.retrieve(meta.id, "alice").await.unwrap().content.len(), 5120);
    }

    #[tokio::test]
    async fn delete_removes_bytes_and_metadata() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;
        let meta = f.store.store(text_file("a.txt", 4), note.id, "alice").await.unwrap();
        assert_eq!(files_on_disk(&f.storage), 1);

        f.store.delete(meta.id, "alice").await.unwrap();

        assert_eq!(files_on_disk(&f.storage), 0);
        assert!(f.repos.attachments.find_by_id(meta.id).await.unwrap().is_none());
        assert!(matches!(
            f.store.delete(meta.id, "alice").await.unwrap_err(),
            AttachmentError::FileNotFound
        ));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_bytes() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;
        let meta = f.store.store(text_file("a.txt", 4), note.id, "alice").await.unwrap();
        let token = f.repos.attachments.find_by_id(meta.id).await.unwrap().unwrap().attachment.file_path;
        std::fs::remove_file(f.storage.root().join(token)).unwrap();

        f.store.delete(meta.id, "alice").await.unwrap();
        assert!(f.repos.attachments.find_by_id(meta.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retrieve_detects_missing_bytes() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;
        let meta = f.store.store(text_file("a.txt", 4), note.id, "alice").await.unwrap();
        let token = f.repos.attachments.find_by_id(meta.id).await.unwrap().unwrap().attachment.file_path;
        std::fs::remove_file(f.storage.root().join(token)).unwrap();

        assert!(matches!(
            f.store.retrieve(meta.id, "alice").await.unwrap_err(),
            AttachmentError::FileNotFound
        ));
    }

    #[tokio::test]
    async fn store_many_skips_empty_entries_and_keeps_order() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;

        let stored = f
            .store
            .store_many(
                vec![text_file("fileA.txt", 10), text_file("fileB.txt", 0), text_file("fileC.txt", 20)],
                note.id,
                "alice",
            )
            .await
            .unwrap();

        let names: Vec<&str> = stored.iter().map(|m| m.file_name.as_str()).collect();
        assert_eq!(names, vec!["fileA.txt", "fileC.txt"]);
        assert_eq!(f.repos.attachments.find_by_note_id(note.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn store_many_with_only_empty_entries_fails() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;

        let err = f
            .store
            .store_many(vec![text_file("a.txt", 0), text_file("b.txt", 0)], note.id, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::NoValidFiles));

        let err = f.store.store_many(vec![], note.id, "alice").await.unwrap_err();
        assert!(matches!(err, AttachmentError::NoValidFiles));
    }

    #[tokio::test]
    async fn store_many_validates_everything_before_writing() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;

        let err = f
            .store
            .store_many(
                vec![
                    text_file("ok.txt", 10),
                    UploadedFile::new("bad.zip", "application/zip", vec![1, 2, 3]),
                ],
                note.id,
                "alice",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AttachmentError::Validation(ValidationFailure::UnsupportedType(_))));
        assert_eq!(files_on_disk(&f.storage), 0);
        assert!(f.repos.attachments.find_by_note_id(note.id).await.unwrap().is_empty());
    }

    /// Disk storage that starts failing writes after a fixed number of successes
    struct FlakyStorage {
        inner: Arc<LocalDiskStorage>,
        writes_allowed: usize,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl BlobStorage for FlakyStorage {
        async fn write_bytes(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
            if self.writes.fetch_add(1, Ordering::SeqCst) >= self.writes_allowed {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.inner.write_bytes(name, bytes).await
        }

        async fn read_bytes(&self, name: &str) -> io::Result<Vec<u8>> {
            self.inner.read_bytes(name).await
        }

        async fn delete_bytes(&self, name: &str) -> io::Result<()> {
            self.inner.delete_bytes(name).await
        }

        async fn exists(&self, name: &str) -> io::Result<bool> {
            self.inner.exists(name).await
        }
    }

    #[tokio::test]
    async fn store_many_rolls_back_on_storage_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let disk = Arc::new(LocalDiskStorage::new(tmp.path()).await.unwrap());
        let flaky = Arc::new(FlakyStorage {
            inner: disk.clone(),
            writes_allowed: 2,
            writes: AtomicUsize::new(0),
        });
        let f = fixture_with(tmp, disk, flaky).await;
        let (_, note) = user_with_note(&f.repos, "alice").await;

        let err = f
            .store
            .store_many(
                vec![text_file("a.txt", 1), text_file("b.txt", 2), text_file("c.txt", 3)],
                note.id,
                "alice",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AttachmentError::Storage { action: "store", .. }));
        assert_eq!(files_on_disk(&f.storage), 0);
        assert!(f.repos.attachments.find_by_note_id(note.id).await.unwrap().is_empty());
    }

    #[test]
    fn storage_token_keeps_only_safe_extension() {
        assert!(storage_token("report.PDF").ends_with(".pdf"));
        assert!(!storage_token("noext").contains('.'));
        assert!(!storage_token("weird.t x t").contains(' '));
        assert_ne!(storage_token("a.txt"), storage_token("a.txt"));
    }

    #[test]
    fn original_name_strips_directories() {
        assert_eq!(original_name("notes.txt"), "notes.txt");
        assert_eq!(original_name("C:\\Users\\me\\doc.pdf"), "doc.pdf");
        assert_eq!(original_name("dir/"), "file");
        assert_eq!(original_name(".."), "file");
    }

    #[test]
    fn long_original_names_fit_the_column() {
        let long = format!("{}.txt", "é".repeat(300));
        let name = original_name(&long);
        assert_eq!(name.chars().count(), MAX_FILE_NAME_LEN);
        assert!(name.ends_with(".txt"));

        let no_ext = "x".repeat(400);
        assert_eq!(original_name(&no_ext), "x".repeat(MAX_FILE_NAME_LEN));

        let exact = "y".repeat(MAX_FILE_NAME_LEN);
        assert_eq!(original_name(&exact), exact);
    }

    #[tokio::test]
    async fn stored_metadata_keeps_shortened_name() {
        let f = fixture().await;
        let (_, note) = user_with_note(&f.repos, "alice").await;
        let declared = format!("{}.txt", "n".repeat(500));

        let meta = f
            .store
            .store(UploadedFile::new(declared, "text/plain", b"abc".to_vec()), note.id, "alice")
            .await
            .unwrap();

        assert_eq!(meta.file_name.chars().count(), MAX_FILE_NAME_LEN);
        assert!(meta.file_name.ends_with(".txt"));
    }
}
