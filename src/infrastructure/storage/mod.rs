use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;

pub mod local;
pub mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store request failed: {0}")]
    Backend(String),

    #[error("object store request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("artifact metadata write failed: {0}")]
    Metadata(String),

    #[error("failed to build retrieval url: {0}")]
    Url(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ObjectStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

pub struct StoredObject {
    pub content_length: Option<u64>,
    pub body: ObjectStream,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Durably writes `data` under `key`. Returns only once the bytes are committed.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn presigned_get(&self, key: &str, expires_in: Duration) -> Result<Option<String>, StorageError>;

    fn backend_name(&self) -> &'static str;
}

pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let well_formed = !key.is_empty()
        && key.len() <= 255
        && !key.contains("..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if well_formed {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
