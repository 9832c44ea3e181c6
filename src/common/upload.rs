use std::path::Path;

use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::common::error::AppError;

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DOC_MIME: &str = "application/msword";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordFormat {
    Docx,
    Doc,
}

impl WordFormat {
    pub fn extension(self) -> &'static str {
        match self {
            WordFormat::Docx => "docx",
            WordFormat::Doc => "doc",
        }
    }
}

/// An upload staged on disk; the file is removed on drop.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    file_name: String,
    size: u64,
}

impl StagedUpload {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub async fn read(&self) -> Result<Bytes, AppError> {
        let data = tokio::fs::read(self.file.path())
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to read staged upload: {}", e)))?;
        Ok(Bytes::from(data))
    }
}

pub fn multipart_error(err: MultipartError, limit: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// Streams a multipart file field into a temporary file under `temp_dir`,
/// failing with 413 as soon as more than `limit` bytes have arrived.
pub async fn stage_field(
    mut field: Field<'_>,
    temp_dir: &Path,
    limit: u64,
    default_name: &str,
) -> Result<StagedUpload, AppError> {
    let file_name = field
        .file_name()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(default_name)
        .to_string();

    tokio::fs::create_dir_all(temp_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to prepare upload directory: {}", e)))?;

    let file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".part")
        .tempfile_in(temp_dir)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create staging file: {}", e)))?;
    let handle = file
        .reopen()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to open staging file: {}", e)))?;
    let mut writer = tokio::fs::File::from_std(handle);

    let mut size: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        size += chunk.len() as u64;
        if size > limit {
            warn!(file_name = %file_name, limit, "Upload exceeds size limit");
            return Err(AppError::PayloadTooLarge { limit });
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {}", e)))?;
    }
    writer
        .flush()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {}", e)))?;

    debug!(file_name = %file_name, size, path = %file.path().display(), "Staged upload");

    Ok(StagedUpload { file, file_name, size })
}

pub async fn text_field(field: Field<'_>, limit: u64) -> Result<Option<String>, AppError> {
    let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
    Ok(Some(value).filter(|v| !v.is_empty()))
}

/// Checks that an upload is a Word document both by its declared name and by
/// its content. A text file renamed to `.docx` fails the content check.
pub fn detect_word_format(file_name: &str, content: &[u8]) -> Result<WordFormat, AppError> {
    let declared = mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string());

    let format = match declared.as_deref() {
        Some(DOCX_MIME) => WordFormat::Docx,
        Some(DOC_MIME) => WordFormat::Doc,
        _ => {
            return Err(AppError::Validation(
                "Invalid file type: only .doc and .docx documents are accepted".to_string(),
            ));
        }
    };

    let content_ok = match format {
        // OOXML packages are ZIP archives whose directory names the word/ parts in the clear.
        WordFormat::Docx => content.starts_with(ZIP_MAGIC) && contains(content, b"word/"),
        WordFormat::Doc => content.starts_with(OLE2_MAGIC),
    };

    if !content_ok {
        return Err(AppError::Validation(format!(
            "Invalid file content: {} is not a valid .{} document",
            file_name,
            format.extension()
        )));
    }

    Ok(format)
}

pub fn is_pdf(content: &[u8]) -> bool {
    content.starts_with(PDF_MAGIC)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
