use crate::handlers::upload::{upload, upload_mode};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// `POST /upload`, `GET /upload/mode`.
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/upload/mode", get(upload_mode))
}
