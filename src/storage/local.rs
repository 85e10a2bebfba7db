use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::BlobStorage;

/// Stores each blob as a flat file under a single upload directory
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    /// Creates the upload directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        let root = fs::canonicalize(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only single, plain path components are accepted as names
    fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name => Ok(self.root.join(part)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "storage name must be a single file name",
            )),
        }
    }
}

#[async_trait]
impl BlobStorage for LocalDiskStorage {
    async fn write_bytes(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(name)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written = async {
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            // Leave nothing half-written behind
            let _ = fs::remove_file(&path).await;
            return Err(e);
        }
        Ok(())
    }

    async fn read_bytes(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(name)?).await
    }

    async fn delete_bytes(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(name)?).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    async fn exists(&self, name: &str) -> io::Result<bool> {
        fs::try_exists(self.path_for(name)?).await
    }
}
