// handlers/protected/notes - owner-scoped note CRUD
//
// GET    /api/notes      - list the caller's notes
// POST   /api/notes      - create
// GET    /api/notes/:id  - show
// PUT    /api/notes/:id  - replace title and content
// DELETE /api/notes/:id  - delete note, its attachments and their stored content

pub mod collection;
pub mod record;

pub use collection::{notes_get, notes_post};
pub use record::{note_delete, note_get, note_put};
