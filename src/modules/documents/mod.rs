use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod repository;
pub mod tracker;

pub fn router() -> Router<AppState> {
    Router::new().route("/{file_id}", get(handler::get_document))
}
