use tracing::{info, warn};

use super::dto::ConvertResponse;
use super::events::ConversionJob;
use crate::common::error::AppError;
use crate::common::upload::{self, StagedUpload};
use crate::state::AppState;

pub struct ConversionService;

impl ConversionService {
    pub async fn convert(
        state: AppState,
        staged: StagedUpload,
        password: Option<String>,
    ) -> Result<ConvertResponse, AppError> {
        let source = staged.read().await?;
        let format = upload::detect_word_format(staged.file_name(), &source)?;
        let original_name = staged.file_name().to_string();
        drop(staged);

        let record = state.tracker.create(&original_name, password.as_deref()).await?;
        let file_id = record.file_id;
        info!(file_id = %file_id, file_name = %original_name, size_bytes = source.len(), "📄 Document accepted for conversion");

        let job = ConversionJob::new(file_id, source, format, password);
        match state.queue.execute(job).await {
            Ok(Ok(done)) => Ok(ConvertResponse {
                storage_url: done.url,
                file_id,
            }),
            // The worker has already recorded the failure.
            Ok(Err(e)) => Err(e.into()),
            Err(e) => {
                warn!(file_id = %file_id, error = %e, "Job did not reach a worker outcome");
                state.tracker.mark_failed(file_id, "queue unavailable").await;
                Err(e.into())
            }
        }
    }
}
