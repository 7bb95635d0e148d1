//! Common routes: health, readiness, version, column metadata.

use crate::config::DEFAULT_GROUP;
use crate::response::ok;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'static str>,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> Result<Json<ReadyBody>, (StatusCode, Json<ReadyBody>)> {
    let degraded = || {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                database: Some("unavailable"),
            }),
        )
    };
    let group = state.db.group(DEFAULT_GROUP).map_err(|_| degraded())?;
    if sqlx::query("SELECT 1").fetch_optional(&group.pool).await.is_err() {
        return Err(degraded());
    }
    Ok(Json(ReadyBody {
        status: "ok",
        database: Some("ok"),
    }))
}

async fn version(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "app": state.config.core.app_name,
        "addons": state.addons,
    }))
}

async fn eps(State(state): State<AppState>) -> impl IntoResponse {
    ok(&state.config.core.success_message, state.eps.clone())
}

/// GET /health, /ready, /version; GET /eps when `with_eps`.
pub fn common_routes(with_eps: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version));
    if with_eps {
        router.route("/eps", get(eps))
    } else {
        router
    }
}
