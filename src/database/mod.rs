pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

use std::sync::Arc;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;
pub use repository::{AttachmentRepository, NoteRepository, Persistence, UserRepository};

/// The persistence collaborators, each as its own trait object
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub attachments: Arc<dyn AttachmentRepository>,
    pub backend: Arc<dyn Persistence>,
}

impl Repositories {
    pub fn from_backend<P>(backend: Arc<P>) -> Self
    where
        P: Persistence + 'static,
    {
        Self {
            users: backend.clone(),
            notes: backend.clone(),
            attachments: backend.clone(),
            backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryDatabase::new()))
    }
}
