use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::{ObjectStore, StorageError, StoredObject, validate_key};

#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "Using local artifact storage");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let start = std::time::Instant::now();
        let write_failed =
            |e: std::io::Error| StorageError::Backend(format!("Failed to write {}: {}", path.display(), e));

        // Removed on drop, including when the caller abandons this future.
        let staging = tempfile::Builder::new()
            .prefix(key)
            .suffix(".part")
            .tempfile_in(&self.root)
            .map_err(write_failed)?;

        let mut file = fs::File::from_std(staging.reopen().map_err(write_failed)?);
        file.write_all(&data).await.map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;
        drop(file);

        staging.persist(&path).map_err(|e| write_failed(e.error))?;

        info!(
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let path = self.path_for(key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let content_length = file.metadata().await.ok().map(|m| m.len());

        Ok(Some(StoredObject {
            content_length,
            body: Box::pin(ReaderStream::new(file)),
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn presigned_get(&self, _key: &str, _expires_in: Duration) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
