use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use super::model::{DocumentRecord, DocumentStatus, StoredArtifact};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub artifact_key: String,
    pub size_bytes: i64,
    pub download_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<StoredArtifact> for ArtifactSummary {
    fn from(a: StoredArtifact) -> Self {
        Self {
            artifact_key: a.artifact_key,
            size_bytes: a.size_bytes,
            download_count: a.download_count,
            created_at: a.created_at,
        }
    }
}

/// Public view of a document record. The password verifier is never exposed.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub file_id: Uuid,
    pub original_name: String,
    pub status: DocumentStatus,
    pub converted_url: Option<String>,
    pub password_protected: bool,
    pub failure_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub artifacts: Vec<ArtifactSummary>,
}

impl DocumentResponse {
    pub fn new(record: DocumentRecord, artifacts: Vec<StoredArtifact>) -> Self {
        Self {
            file_id: record.file_id,
            original_name: record.original_name,
            status: record.status,
            converted_url: record.converted_url,
            password_protected: record.password_protected,
            failure_reason: record.failure_reason,
            created_at: record.created_at,
            updated_at: record.updated_at,
            artifacts: artifacts.into_iter().map(ArtifactSummary::from).collect(),
        }
    }
}
