//! CRUD routes of one controller.

use crate::controller::{mount, Controller};
use crate::handlers::crud::{add, delete, info, list, page, update};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

/// `POST /add|/delete|/update|/list|/page` and `GET|POST /info` under the controller prefix.
/// Every route is registered; operations outside the allow-list answer 404 from the handler.
pub fn crud_routes(controller: Controller) -> Router<AppState> {
    let prefix = controller.prefix.clone();
    tracing::debug!(prefix = %prefix, api = ?controller.api, "mounting controller");
    let routes = Router::new()
        .route("/add", post(add))
        .route("/delete", post(delete))
        .route("/update", post(update))
        .route("/info", get(info).post(info))
        .route("/list", post(list))
        .route("/page", post(page))
        .layer(Extension(Arc::new(controller)));
    mount(&prefix, routes)
}
