use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use super::dto::DocumentResponse;
use crate::common::error::AppError;
use crate::common::response::{ApiSuccess, ErrorResponse};
use crate::state::AppState;

/// Current lifecycle state of a submitted document
#[utoipa::path(
    get,
    path = "/documents/{file_id}",
    params(
        ("file_id" = Uuid, Path, description = "Id returned by /convert")
    ),
    responses(
        (status = 200, description = "Document record", body = DocumentResponse),
        (status = 404, description = "Unknown document", body = ErrorResponse)
    ),
    tag = "Documents"
)]
pub async fn get_document(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .tracker
        .get(file_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {} not found", file_id)))?;
    let artifacts = state.tracker.repository().artifacts_for(file_id).await?;

    Ok(ApiSuccess(DocumentResponse::new(record, artifacts), StatusCode::OK))
}
