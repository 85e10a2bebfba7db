//! Durable byte storage for attachment content, keyed by storage token.

pub mod local;

use async_trait::async_trait;
use std::io;

pub use local::LocalDiskStorage;

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write `bytes` under `name` and return only once they are durable.
    /// Fails with `AlreadyExists` rather than overwrite.
    async fn write_bytes(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    async fn read_bytes(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Removing a name that does not exist is not an error
    async fn delete_bytes(&self, name: &str) -> io::Result<()>;

    async fn exists(&self, name: &str) -> io::Result<bool>;
}
