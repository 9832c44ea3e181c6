use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::common::pdf_protect::EncryptionError;
use crate::common::upload::WordFormat;
use crate::infrastructure::engine::ConversionError;
use crate::infrastructure::storage::StorageError;

pub struct ConversionJob {
    pub job_id: Uuid,
    pub file_id: Uuid,
    pub source: Bytes,
    pub format: WordFormat,
    pub password: Option<String>,
    pub submitted_at: OffsetDateTime,
}

impl ConversionJob {
    pub fn new(file_id: Uuid, source: Bytes, format: WordFormat, password: Option<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            file_id,
            source,
            format,
            password,
            submitted_at: OffsetDateTime::now_utc(),
        }
    }
}

// Keeps the password and document body out of logs.
impl fmt::Debug for ConversionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionJob")
            .field("job_id", &self.job_id)
            .field("file_id", &self.file_id)
            .field("source_bytes", &self.source.len())
            .field("format", &self.format)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("submitted_at", &self.submitted_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub file_id: Uuid,
    pub artifact_key: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::Conversion(ConversionError::Timeout(_)) => "conversion timed out",
            PipelineError::Conversion(_) => "conversion failed",
            PipelineError::Encryption(_) => "encryption failed",
            PipelineError::Storage(_) => "storage failed",
        }
    }
}

pub type JobOutcome = Result<ConvertedDocument, PipelineError>;
