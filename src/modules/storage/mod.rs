use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod keys;
pub mod links;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handler::upload_pdf))
        .route("/download/{artifact_key}", get(handler::download_pdf))
}
