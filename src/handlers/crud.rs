//! CRUD handlers shared by every controller. The controller travels as a request extension.

use crate::controller::Controller;
use crate::db::DbConn;
use crate::error::AppError;
use crate::request::{Params, RequestCtx};
use crate::response::ok;
use crate::service::{Api, CrudService};
use crate::state::{AppContext, AppState};
use axum::{
    body::Bytes,
    extract::{OriginalUri, Query, State},
    response::IntoResponse,
    Extension,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Empty bodies are allowed; anything else must be a JSON object.
fn parse_body(body: &Bytes) -> Result<Option<Map<String, Value>>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(e) => Err(AppError::BadRequest(format!("invalid JSON body: {}", e))),
    }
}

/// Invalidate, commit, then invalidate again. Pages cached while the commit was in flight are dropped too.
async fn commit_and_invalidate<F>(service: &CrudService, req: &RequestCtx, commit: F) -> Result<(), AppError>
where
    F: Future<Output = Result<(), sqlx::Error>>,
{
    service.cache_do(req).await?;
    commit.await?;
    service.cache_do(req).await
}

/// Add/Delete/Update in one transaction: before hook, operation, after hook, cache invalidation, commit.
async fn mutate(state: &AppContext, controller: &Controller, api: Api, req: &RequestCtx) -> Result<Value, AppError> {
    let service = &controller.service;
    let hooks = service.service_hooks();
    let group = state.db.group(service.group())?;
    let mut tx = group.pool.begin().await?;
    let data = {
        let mut conn = DbConn::new(&mut *tx, group);
        hooks.modify_before(&mut conn, api, &req.params).await?;
        let data = match api {
            Api::Add => service.add(&mut conn, req).await?,
            Api::Delete => service.delete(&mut conn, req).await?,
            Api::Update => service.update(&mut conn, req).await?,
            other => return Err(AppError::BadRequest(format!("{} is not a mutation", other))),
        };
        let mut after = req.params.clone();
        if let Some(id) = data.get("id").filter(|_| api == Api::Add) {
            after.insert("id", id.clone());
        }
        hooks.modify_after(&mut conn, api, &after).await?;
        data
    };
    commit_and_invalidate(service, req, tx.commit()).await?;
    Ok(data)
}

async fn read(state: &AppContext, controller: &Controller, api: Api, req: &RequestCtx) -> Result<Value, AppError> {
    let service = &controller.service;
    let group = state.db.group(service.group())?;
    let mut pooled = group.pool.acquire().await?;
    let mut conn = DbConn::new(&mut *pooled, group);
    match api {
        Api::Info => service.info(&mut conn, req).await,
        Api::List => service.list(&mut conn, req).await,
        Api::Page => service.page(&mut conn, req).await,
        other => Err(AppError::BadRequest(format!("{} is not a read", other))),
    }
}

async fn dispatch(
    state: AppState,
    controller: Arc<Controller>,
    api: Api,
    uri: OriginalUri,
    query: HashMap<String, String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    if !controller.allows(api) {
        return Err(AppError::NotFound(uri.path().to_string()));
    }
    let req = RequestCtx::new(uri.path(), Params::from_parts(query, parse_body(&body)?));
    tracing::debug!(route = %req.route, api = %api, "crud request");
    let data = match api {
        Api::Add | Api::Delete | Api::Update => mutate(&state, &controller, api, &req).await?,
        Api::Info | Api::List | Api::Page => read(&state, &controller, api, &req).await?,
    };
    Ok(ok(&state.config.core.success_message, data))
}

macro_rules! crud_handler {
    ($name:ident, $api:expr) => {
        pub async fn $name(
            State(state): State<AppState>,
            Extension(controller): Extension<Arc<Controller>>,
            uri: OriginalUri,
            Query(query): Query<HashMap<String, String>>,
            body: Bytes,
        ) -> Result<impl IntoResponse, AppError> {
            dispatch(state, controller, $api, uri, query, body).await
        }
    };
}

crud_handler!(add, Api::Add);
crud_handler!(delete, Api::Delete);
crud_handler!(update, Api::Update);
crud_handler!(info, Api::Info);
crud_handler!(list, Api::List);
crud_handler!(page, Api::Page);
