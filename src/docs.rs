use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::modules::conversion::handler::convert_document,
        crate::modules::storage::handler::upload_pdf,
        crate::modules::storage::handler::download_pdf,
        crate::modules::documents::handler::get_document,
    ),
    components(
        schemas(
            crate::common::response::ErrorResponse,
            crate::routes::HealthResponse,
            crate::modules::conversion::dto::ConvertForm,
            crate::modules::conversion::dto::ConvertResponse,
            crate::modules::storage::dto::UploadForm,
            crate::modules::storage::dto::UploadResponse,
            crate::modules::documents::dto::DocumentResponse,
            crate::modules::documents::dto::ArtifactSummary,
            crate::modules::documents::model::DocumentStatus,
        )
    ),
    tags(
        (name = "Conversion", description = "Word to PDF conversion"),
        (name = "Storage", description = "Artifact upload and download"),
        (name = "Documents", description = "Submission lifecycle"),
        (name = "Health", description = "Service status")
    )
)]
pub struct ApiDoc;
