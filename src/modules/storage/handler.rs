use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::dto::{DownloadQuery, UploadForm, UploadResponse};
use super::keys;
use crate::common::error::AppError;
use crate::common::response::{ApiSuccess, ErrorResponse};
use crate::common::upload::{self, StagedUpload};
use crate::state::AppState;

/// Store an already-converted PDF
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "PDF stored", body = UploadResponse),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "Storage"
)]
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let limit = state.config.max_upload_bytes;
    let mut staged: Option<StagedUpload> = None;
    let mut file_id: Option<String> = None;
    let mut password: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload::multipart_error(e, limit))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                staged = Some(upload::stage_field(field, &state.config.upload_temp_dir, limit, "upload.pdf").await?)
            }
            "fileId" => file_id = upload::text_field(field, limit).await?,
            "password" => password = upload::text_field(field, limit).await?,
            _ => {}
        }
    }

    let staged = staged.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    let file_id = file_id
        .ok_or_else(|| AppError::Validation("fileId is required".to_string()))?
        .parse::<Uuid>()
        .map_err(|_| AppError::Validation("fileId must be a UUID".to_string()))?;

    let pdf = staged.read().await?;
    if !upload::is_pdf(&pdf) {
        return Err(AppError::Validation("File is not a PDF".to_string()));
    }
    drop(staged);

    let stored = state
        .storage
        .persist(pdf, &keys::artifact_name(), file_id, password.is_some())
        .await?;

    Ok(ApiSuccess(UploadResponse { url: stored.url }, StatusCode::CREATED))
}

/// Download a stored PDF
#[utoipa::path(
    get,
    path = "/download/{artifact_key}",
    params(
        ("artifact_key" = String, Path, description = "Key from a retrieval URL"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "PDF bytes", content_type = "application/pdf", body = Vec<u8>),
        (status = 403, description = "Known artifact, but the token is missing, invalid or expired", body = ErrorResponse),
        (status = 404, description = "Unknown artifact", body = ErrorResponse)
    ),
    tag = "Storage"
)]
pub async fn download_pdf(
    State(state): State<AppState>,
    Path(artifact_key): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let object = state
        .storage
        .open_download(&artifact_key, query.token.as_deref())
        .await?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime::APPLICATION_PDF.as_ref())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", artifact_key),
        );
    if let Some(len) = object.content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder
        .body(Body::from_stream(object.body))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build download response: {}", e)))
}
