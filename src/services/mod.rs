pub mod attachment_service;
pub mod note_service;

pub use attachment_service::{
    AttachmentError, AttachmentMetadata, AttachmentStore, RetrievedFile, UploadedFile, ValidationFailure,
};
pub use note_service::{NoteError, NoteInput, NoteService, NoteView};
