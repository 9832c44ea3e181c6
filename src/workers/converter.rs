use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{error, info};

use crate::common::pdf_protect::{self, EncryptionError};
use crate::infrastructure::engine::{ConversionEngine, ConversionError};
use crate::infrastructure::queue::JobHandler;
use crate::modules::conversion::events::{ConversionJob, ConvertedDocument, JobOutcome, PipelineError};
use crate::modules::documents::tracker::LifecycleTracker;
use crate::modules::storage::keys;
use crate::modules::storage::service::StorageHandoff;

pub struct ConversionWorker {
    engine: Arc<dyn ConversionEngine>,
    storage: StorageHandoff,
    tracker: LifecycleTracker,
    engine_timeout: Duration,
}

impl ConversionWorker {
    pub fn new(
        engine: Arc<dyn ConversionEngine>,
        storage: StorageHandoff,
        tracker: LifecycleTracker,
        engine_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            storage,
            tracker,
            engine_timeout,
        }
    }

    async fn process(&self, job: &ConversionJob) -> JobOutcome {
        let pdf = tokio::time::timeout(self.engine_timeout, self.engine.convert(&job.source, job.format))
            .await
            .map_err(|_| ConversionError::Timeout(self.engine_timeout))??;

        let pdf = match &job.password {
            Some(password) => encrypt(pdf, password.clone()).await?,
            None => pdf,
        };

        let artifact_name = keys::artifact_name();

        self.tracker.mark_uploading(job.file_id).await;
        let stored = self
            .storage
            .persist(pdf, &artifact_name, job.file_id, job.password.is_some())
            .await?;
        self.tracker.mark_completed(job.file_id, &stored.url).await;

        Ok(ConvertedDocument {
            file_id: job.file_id,
            artifact_key: stored.artifact.artifact_key,
            url: stored.url,
        })
    }
}

async fn encrypt(pdf: Bytes, password: String) -> Result<Bytes, EncryptionError> {
    let protected = tokio::task::spawn_blocking(move || pdf_protect::protect(&pdf, &password))
        .await
        .map_err(|e| EncryptionError::Task(e.to_string()))??;
    Ok(Bytes::from(protected))
}

#[async_trait]
impl JobHandler for ConversionWorker {
    async fn handle(&self, job: &ConversionJob) -> JobOutcome {
        let start = Instant::now();
        info!(job_id = %job.job_id, file_id = %job.file_id, "⚙️ Processing conversion job");

        let outcome = self.process(job).await;
        match &outcome {
            Ok(done) => info!(
                job_id = %job.job_id,
                file_id = %job.file_id,
                key = %done.artifact_key,
                duration_ms = start.elapsed().as_millis() as u64,
                "✅ Conversion job completed"
            ),
            Err(e) => {
                error!(job_id = %job.job_id, file_id = %job.file_id, error = %e, "❌ Conversion job failed");
                self.tracker.mark_failed(job.file_id, e.reason()).await;
            }
        }
        outcome
    }
}
