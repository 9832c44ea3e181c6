use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::state::AppState;

pub fn configure_routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .merge(crate::modules::conversion::router())
        .merge(crate::modules::storage::router())
        .nest("/documents", crate::modules::documents::router())
        .layer(cors)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage_backend: &'static str,
    pub queue_depth: usize,
    pub active_jobs: usize,
    pub workers: usize,
    pub tracker_write_failures: u64,
}

/// Liveness and pipeline counters
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage_backend: state.storage.backend_name(),
        queue_depth: state.queue.depth(),
        active_jobs: state.queue.active(),
        workers: state.queue.worker_count(),
        tracker_write_failures: state.tracker.write_failures(),
    })
}
