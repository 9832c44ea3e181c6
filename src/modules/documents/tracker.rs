use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::model::{DocumentRecord, DocumentStatus};
use super::repository::{DocumentRepository, Transition};
use crate::common::error::AppError;
use crate::common::security;

#[derive(Clone)]
pub struct LifecycleTracker {
    repo: Arc<dyn DocumentRepository>,
    write_failures: Arc<AtomicU64>,
}

impl LifecycleTracker {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repo,
            write_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn repository(&self) -> &Arc<dyn DocumentRepository> {
        &self.repo
    }

    pub async fn create(&self, original_name: &str, password: Option<&str>) -> Result<DocumentRecord, AppError> {
        let verifier = match password {
            Some(password) => {
                let password = password.to_string();
                let hashed = tokio::task::spawn_blocking(move || security::hash_password(&password))
                    .await
                    .context("password hashing task failed")??;
                Some(hashed)
            }
            None => None,
        };

        let record = DocumentRecord::new(original_name, verifier);
        self.repo.insert_document(&record).await?;
        debug!(target: "tracker", file_id = %record.file_id, "Document record created");
        Ok(record)
    }

    pub async fn mark_uploading(&self, file_id: Uuid) {
        self.apply(
            file_id,
            Transition {
                status: DocumentStatus::Uploading,
                converted_url: None,
                failure_reason: None,
            },
        )
        .await;
    }

    pub async fn mark_completed(&self, file_id: Uuid, url: &str) {
        let completed = Transition {
            status: DocumentStatus::Completed,
            converted_url: Some(url),
            failure_reason: None,
        };
        if self.apply(file_id, completed).await != Some(false) {
            return;
        }

        // The uploading write may have been lost; replay it before completing.
        match self.repo.get_document(file_id).await {
            Ok(Some(record)) if record.status == DocumentStatus::Processing => {
                self.mark_uploading(file_id).await;
                self.apply(file_id, completed).await;
            }
            Ok(_) => {}
            Err(e) => {
                self.write_failures.fetch_add(1, Ordering::Relaxed);
                error!(target: "tracker", file_id = %file_id, error = %e, "Failed to read document status");
            }
        }
    }

    /// Safe to call repeatedly; a record already terminal is left alone.
    pub async fn mark_failed(&self, file_id: Uuid, reason: &str) {
        self.apply(
            file_id,
            Transition {
                status: DocumentStatus::Failed,
                converted_url: None,
                failure_reason: Some(reason),
            },
        )
        .await;
    }

    pub async fn get(&self, file_id: Uuid) -> Result<Option<DocumentRecord>, AppError> {
        Ok(self.repo.get_document(file_id).await?)
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// `None` when the write itself failed.
    async fn apply(&self, file_id: Uuid, transition: Transition<'_>) -> Option<bool> {
        let status = transition.status;
        match self.repo.transition(file_id, transition).await {
            Ok(true) => {
                debug!(target: "tracker", file_id = %file_id, status = %status, "Document status updated");
                Some(true)
            }
            Ok(false) => {
                warn!(target: "tracker", file_id = %file_id, status = %status, "Status change not applicable; record unchanged");
                Some(false)
            }
            Err(e) => {
                self.write_failures.fetch_add(1, Ordering::Relaxed);
                error!(target: "tracker", file_id = %file_id, status = %status, error = %e, "Failed to persist document status");
                None
            }
        }
    }
}
