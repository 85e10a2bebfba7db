pub mod file_attachment;
pub mod note;
pub mod user;

pub use file_attachment::{FileAttachment, NewFileAttachment, OwnedAttachment};
pub use note::{NewNote, Note};
pub use user::{NewUser, User, ROLE_USER};
