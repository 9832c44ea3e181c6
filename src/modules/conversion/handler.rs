use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::dto::{ConvertForm, ConvertResponse};
use super::service::ConversionService;
use crate::common::error::AppError;
use crate::common::response::{ApiSuccess, ErrorResponse};
use crate::common::upload::{self, StagedUpload};
use crate::state::AppState;

/// Convert a Word document to PDF
#[utoipa::path(
    post,
    path = "/convert",
    request_body(content = ConvertForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Converted and stored", body = ConvertResponse),
        (status = 400, description = "Missing file or unsupported type", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Conversion or storage failed", body = ErrorResponse),
        (status = 503, description = "Conversion queue unavailable", body = ErrorResponse)
    ),
    tag = "Conversion"
)]
pub async fn convert_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let limit = state.config.max_upload_bytes;
    let mut staged: Option<StagedUpload> = None;
    let mut password: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload::multipart_error(e, limit))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                staged = Some(upload::stage_field(field, &state.config.upload_temp_dir, limit, "document").await?)
            }
            "password" => password = upload::text_field(field, limit).await?,
            _ => {}
        }
    }

    let staged = staged.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    // Detached so a client disconnect neither cancels the job nor leaks the staged file.
    let response = tokio::spawn(ConversionService::convert(state, staged, password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Conversion task failed: {}", e)))??;

    Ok(ApiSuccess(response, StatusCode::OK))
}
