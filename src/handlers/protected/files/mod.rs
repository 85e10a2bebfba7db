// handlers/protected/files - attachment upload, download and delete
//
// All three answer 404 with one shared message whether the target is absent
// or belongs to another user.

pub mod delete;
pub mod download;
pub mod upload;

pub use delete::file_delete;
pub use download::file_get;
pub use upload::upload_post;
