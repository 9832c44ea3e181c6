use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::common::upload::WordFormat;

pub mod soffice;

pub use soffice::SofficeEngine;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to prepare conversion workspace: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("conversion engine unavailable: {0}")]
    Unavailable(String),

    #[error("conversion engine exited with {status}: {stderr}")]
    Engine { status: String, stderr: String },

    #[error("conversion engine produced no output")]
    MissingOutput,

    #[error("conversion engine output is not a PDF")]
    InvalidOutput,

    #[error("conversion timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait ConversionEngine: Send + Sync {
    async fn convert(&self, source: &[u8], format: WordFormat) -> Result<Bytes, ConversionError>;
}
