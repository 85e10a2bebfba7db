use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileAttachment {
    pub id: Uuid,
    pub note_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    /// Generated storage token; never exposed to clients
    #[serde(skip_serializing)]
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Attachment row joined with the id of the user who owns its note
#[derive(Debug, Clone, FromRow)]
pub struct OwnedAttachment {
    #[sqlx(flatten)]
    pub attachment: FileAttachment,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewFileAttachment {
    pub note_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_path: String,
}
