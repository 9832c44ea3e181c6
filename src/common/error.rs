use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::common::pdf_protect::EncryptionError;
use crate::common::response::ApiError;
use crate::infrastructure::engine::ConversionError;
use crate::infrastructure::queue::QueueError;
use crate::infrastructure::storage::StorageError;
use crate::modules::conversion::events::PipelineError;
use crate::modules::documents::repository::RepositoryError;

/// Every failure an HTTP handler can surface. The `Display` text is for
/// logs; clients only ever see [`AppError::public_message`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("encryption failed: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("upstream service error: {message}")]
    Upstream {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Conversion(_) | AppError::Encryption(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Upstream { status, .. } => status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Forbidden(msg) => msg.clone(),
            AppError::PayloadTooLarge { limit } => format!("File exceeds the {} byte limit", limit),
            AppError::Conversion(_) => "Document conversion failed".to_string(),
            AppError::Encryption(_) => "Password protection failed".to_string(),
            AppError::Storage(_) => "Storage operation failed".to_string(),
            AppError::Upstream { message, .. } => message.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Conversion(e) => AppError::Conversion(e),
            PipelineError::Encryption(e) => AppError::Encryption(e),
            PipelineError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed => AppError::Upstream {
                status: Some(StatusCode::SERVICE_UNAVAILABLE),
                message: "Conversion service is not accepting jobs".to_string(),
            },
            QueueError::WorkerLost => AppError::Upstream {
                status: None,
                message: "Conversion worker did not report a result".to_string(),
            },
            QueueError::Duplicate(job_id) => {
                AppError::Internal(anyhow::anyhow!("job {} is already in flight", job_id))
            }
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Request rejected");
        }
        ApiError(self.public_message(), status).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::PayloadTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::from(ConversionError::MissingOutput).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(QueueError::Closed).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Upstream { status: None, message: "x".into() }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_errors_do_not_leak_details() {
        let err = AppError::from(ConversionError::Engine {
            status: "exit status: 1".into(),
            stderr: "/tmp/convert-abc/source.docx: broken".into(),
        });
        assert_eq!(err.public_message(), "Document conversion failed");

        let err = AppError::Internal(anyhow::anyhow!("connection refused at 10.0.0.3"));
        assert_eq!(err.public_message(), "Internal server error");
    }
}
