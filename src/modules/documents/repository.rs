use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{DocumentRecord, DocumentRow, DocumentStatus, StoredArtifact};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub status: DocumentStatus,
    pub converted_url: Option<&'a str>,
    pub failure_reason: Option<&'a str>,
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), RepositoryError>;

    async fn get_document(&self, file_id: Uuid) -> Result<Option<DocumentRecord>, RepositoryError>;

    /// Returns whether the record changed.
    async fn transition(&self, file_id: Uuid, transition: Transition<'_>) -> Result<bool, RepositoryError>;

    async fn insert_artifact(&self, artifact: &StoredArtifact) -> Result<(), RepositoryError>;

    async fn find_artifact(&self, artifact_key: &str) -> Result<Option<StoredArtifact>, RepositoryError>;

    async fn artifacts_for(&self, file_id: Uuid) -> Result<Vec<StoredArtifact>, RepositoryError>;

    async fn record_download(&self, artifact_key: &str) -> Result<(), RepositoryError>;
}

pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO documents
                (file_id, original_name, status, converted_url, password_protected,
                 password_verifier, failure_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.file_id)
        .bind(&record.original_name)
        .bind(record.status.as_str())
        .bind(&record.converted_url)
        .bind(record.password_protected)
        .bind(&record.password_verifier)
        .bind(&record.failure_reason)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(record.file_id.to_string())
            }
            other => other.into(),
        })?;

        Ok(())
    }

    async fn get_document(&self, file_id: Uuid) -> Result<Option<DocumentRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE file_id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(DocumentRecord::try_from)
            .transpose()
            .map_err(RepositoryError::Corrupt)
    }

    async fn transition(&self, file_id: Uuid, transition: Transition<'_>) -> Result<bool, RepositoryError> {
        let sources: Vec<String> = DocumentStatus::sources_of(transition.status)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        // Only a legal predecessor state is ever overwritten.
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET status = $2,
                converted_url = $3,
                failure_reason = $4,
                updated_at = NOW()
            WHERE file_id = $1 AND status = ANY($5)
            "#,
        )
        .bind(file_id)
        .bind(transition.status.as_str())
        .bind(transition.converted_url)
        .bind(transition.failure_reason)
        .bind(&sources)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_artifact(&self, artifact: &StoredArtifact) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO artifacts
                (artifact_key, file_id, size_bytes, password_protected, download_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&artifact.artifact_key)
        .bind(artifact.file_id)
        .bind(artifact.size_bytes)
        .bind(artifact.password_protected)
        .bind(artifact.download_count)
        .bind(artifact.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(artifact.artifact_key.clone())
            }
            other => other.into(),
        })?;

        Ok(())
    }

    async fn find_artifact(&self, artifact_key: &str) -> Result<Option<StoredArtifact>, RepositoryError> {
        let artifact = sqlx::query_as::<_, StoredArtifact>("SELECT * FROM artifacts WHERE artifact_key = $1")
            .bind(artifact_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(artifact)
    }

    async fn artifacts_for(&self, file_id: Uuid) -> Result<Vec<StoredArtifact>, RepositoryError> {
        let artifacts = sqlx::query_as::<_, StoredArtifact>(
            "SELECT * FROM artifacts WHERE file_id = $1 ORDER BY created_at",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(artifacts)
    }

    async fn record_download(&self, artifact_key: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE artifacts SET download_count = download_count + 1 WHERE artifact_key = $1")
            .bind(artifact_key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDocumentRepository {
    documents: RwLock<HashMap<Uuid, DocumentRecord>>,
    artifacts: RwLock<HashMap<String, StoredArtifact>>,
}

impl MemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepository {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&record.file_id) {
            return Err(RepositoryError::Conflict(record.file_id.to_string()));
        }
        documents.insert(record.file_id, record.clone());
        Ok(())
    }

    async fn get_document(&self, file_id: Uuid) -> Result<Option<DocumentRecord>, RepositoryError> {
        Ok(self.documents.read().await.get(&file_id).cloned())
    }

    async fn transition(&self, file_id: Uuid, transition: Transition<'_>) -> Result<bool, RepositoryError> {
        let mut documents = self.documents.write().await;
        let Some(record) = documents.get_mut(&file_id) else {
            return Ok(false);
        };
        if !record.status.can_transition_to(transition.status) {
            return Ok(false);
        }

        record.status = transition.status;
        record.converted_url = transition.converted_url.map(str::to_string);
        record.failure_reason = transition.failure_reason.map(str::to_string);
        record.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn insert_artifact(&self, artifact: &StoredArtifact) -> Result<(), RepositoryError> {
        let mut artifacts = self.artifacts.write().await;
        if artifacts.contains_key(&artifact.artifact_key) {
            return Err(RepositoryError::Conflict(artifact.artifact_key.clone()));
        }
        artifacts.insert(artifact.artifact_key.clone(), artifact.clone());
        Ok(())
    }

    async fn find_artifact(&self, artifact_key: &str) -> Result<Option<StoredArtifact>, RepositoryError> {
        Ok(self.artifacts.read().await.get(artifact_key).cloned())
    }

    async fn artifacts_for(&self, file_id: Uuid) -> Result<Vec<StoredArtifact>, RepositoryError> {
        let mut found: Vec<_> = self
            .artifacts
            .read()
            .await
            .values()
            .filter(|a| a.file_id == file_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn record_download(&self, artifact_key: &str) -> Result<(), RepositoryError> {
        if let Some(artifact) = self.artifacts.write().await.get_mut(artifact_key) {
            artifact.download_count += 1;
        }
        Ok(())
    }
}
