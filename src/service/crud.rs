//! Generic Add/Delete/Update/Info/List/Page over one table.

use super::cache::PageCacheKey;
use super::validation::RequestValidator;
use super::{NoHooks, ServiceContext, ServiceHooks};
use crate::dao::{Dao, ModelDao};
use crate::db::DbConn;
use crate::error::AppError;
use crate::model::{Model, ID_COLUMN};
use crate::query::{Predicate, QueryOp};
use crate::request::{value_text, RequestCtx};
use crate::sql::{self, parse_request_order, CmpOp, Condition, SelectQuery};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Row cap for List.
pub const LIST_LIMIT: u64 = 10_000;
const DEFAULT_PAGE: u64 = 1;
const DEFAULT_SIZE: u64 = 10;

/// Precondition run before Info, List and Page; an error aborts the call before any query.
pub type BeforeFn = Arc<dyn Fn(&RequestCtx) -> Result<(), AppError> + Send + Sync>;
/// Server-side values merged into every Add; they overwrite request values.
pub type InsertParamFn = Arc<dyn Fn(&RequestCtx) -> Map<String, Value> + Send + Sync>;

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn qualify(alias: Option<&str>, column: &str) -> String {
    match alias {
        Some(a) => format!("{}.{}", a, column),
        None => column.to_string(),
    }
}

/// Ids travel as text so they compare against the VARCHAR key on every driver.
fn id_value(v: &Value) -> Value {
    Value::String(value_text(v))
}

pub struct CrudService {
    dao: Arc<dyn Dao>,
    model: Option<Arc<dyn Model>>,
    ctx: ServiceContext,
    list_op: Option<Arc<QueryOp>>,
    page_op: Option<Arc<QueryOp>>,
    insert_param: Option<InsertParamFn>,
    before: Option<BeforeFn>,
    info_ignore: Vec<String>,
    unique_keys: Vec<(String, String)>,
    not_null_keys: Vec<(String, String)>,
    hooks: Arc<dyn ServiceHooks>,
}

impl CrudService {
    pub fn for_model(model: Arc<dyn Model>, ctx: ServiceContext) -> Self {
        let dao: Arc<dyn Dao> = Arc::new(ModelDao::new(model.clone(), &ctx.time));
        let mut svc = Self::for_dao(dao, ctx);
        svc.model = Some(model);
        svc
    }

    pub fn for_dao(dao: Arc<dyn Dao>, ctx: ServiceContext) -> Self {
        CrudService {
            dao,
            model: None,
            ctx,
            list_op: None,
            page_op: None,
            insert_param: None,
            before: None,
            info_ignore: Vec::new(),
            unique_keys: Vec::new(),
            not_null_keys: Vec::new(),
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn list_query(mut self, op: QueryOp) -> Self {
        self.list_op = Some(Arc::new(op));
        self
    }

    pub fn page_query(mut self, op: QueryOp) -> Self {
        self.page_op = Some(Arc::new(op));
        self
    }

    pub fn insert_param<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestCtx) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.insert_param = Some(Arc::new(f));
        self
    }

    pub fn before<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestCtx) -> Result<(), AppError> + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(f));
        self
    }

    /// Properties stripped from Info results.
    pub fn info_ignore<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.info_ignore = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Checked in registration order; `message` is returned on conflict.
    pub fn unique_key(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.unique_keys.push((field.into(), message.into()));
        self
    }

    pub fn not_null_key(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.not_null_keys.push((field.into(), message.into()));
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ServiceHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn dao(&self) -> &Arc<dyn Dao> {
        &self.dao
    }

    pub fn model(&self) -> Option<&Arc<dyn Model>> {
        self.model.as_ref()
    }

    pub fn group(&self) -> &str {
        self.dao.group()
    }

    pub fn service_hooks(&self) -> &Arc<dyn ServiceHooks> {
        &self.hooks
    }

    fn run_before(&self, req: &RequestCtx) -> Result<(), AppError> {
        match &self.before {
            Some(f) => f(req),
            None => Ok(()),
        }
    }

    /// Soft-delete column, when configured and carried by this table.
    fn soft_delete_column(&self) -> Option<&str> {
        let col = self.ctx.time.deleted.as_deref()?;
        self.dao.has_column(col).then_some(col)
    }

    fn live_filter(&self, alias: Option<&str>) -> Option<Condition> {
        self.soft_delete_column()
            .map(|col| Condition::IsNull(qualify(alias, col)))
    }

    fn stamp(&self, data: &mut Map<String, Value>, columns: &[&String]) {
        let now = now();
        for col in columns {
            if self.dao.has_column(col) {
                data.insert(col.to_string(), Value::String(now.clone()));
            }
        }
    }

    /// Drop keys that are not columns of the table, when the columns are known.
    fn keep_known_columns(&self, data: &mut Map<String, Value>) {
        let columns = self.dao.columns();
        if !columns.is_empty() {
            data.retain(|k, _| columns.iter().any(|c| c == k));
        }
    }

    async fn count_matching(
        &self,
        conn: &mut DbConn<'_>,
        field: &str,
        value: &Value,
        exclude_id: Option<&Value>,
    ) -> Result<u64, AppError> {
        let base = self.dao.query();
        let alias = base.alias_name().map(str::to_string);
        let mut q = base.where_field(field, value.clone());
        if let Some(id) = exclude_id {
            q = q.filter(Condition::Cmp(qualify(alias.as_deref(), ID_COLUMN), CmpOp::Ne, id.clone()));
        }
        if let Some(c) = self.live_filter(alias.as_deref()) {
            q = q.filter(c);
        }
        conn.fetch_count(&q.to_count(conn.dialect())).await
    }

    async fn check_unique(
        &self,
        conn: &mut DbConn<'_>,
        req: &RequestCtx,
        exclude_id: Option<&Value>,
    ) -> Result<(), AppError> {
        for (field, message) in &self.unique_keys {
            let Some(value) = req.params.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            if self.count_matching(conn, field, value, exclude_id).await? > 0 {
                tracing::debug!(table = %self.dao.table(), field = %field, "unique key conflict");
                return Err(AppError::Validation(message.clone()));
            }
        }
        Ok(())
    }

    /// Insert the request as one row with a fresh id. Returns `{id}`.
    pub async fn add(&self, conn: &mut DbConn<'_>, req: &RequestCtx) -> Result<Value, AppError> {
        RequestValidator::not_null(&req.params, &self.not_null_keys)?;
        self.check_unique(conn, req, None).await?;

        let mut data = req.params.as_map().clone();
        if let Some(f) = &self.insert_param {
            data.extend(f(req));
        }
        let id = self.ctx.ids.next_id();
        data.insert(ID_COLUMN.to_string(), Value::String(id.clone()));
        self.stamp(&mut data, &[&self.ctx.time.created, &self.ctx.time.updated]);
        self.keep_known_columns(&mut data);

        let row: Vec<(String, Value)> = data.into_iter().collect();
        conn.execute(&sql::insert(conn.dialect(), self.dao.table(), &row)).await?;
        Ok(json!({ "id": id }))
    }

    /// Delete (or soft-delete) every row whose id is in `ids`. Unknown ids are not an error.
    pub async fn delete(&self, conn: &mut DbConn<'_>, req: &RequestCtx) -> Result<Value, AppError> {
        let ids: Vec<Value> = req.params.ids().iter().map(id_value).collect();
        let dialect = conn.dialect();
        let table = self.dao.table();
        let q = match self.soft_delete_column() {
            Some(col) => sql::update(
                dialect,
                table,
                &[(col.to_string(), Value::String(now()))],
                &[Condition::In(ID_COLUMN.into(), ids), Condition::IsNull(col.to_string())],
            ),
            None => sql::delete(dialect, table, &[Condition::In(ID_COLUMN.into(), ids)]),
        };
        let affected = conn.execute(&q).await?;
        Ok(json!({ "affected": affected }))
    }

    /// Update the columns present in the request on the row named by `id`.
    pub async fn update(&self, conn: &mut DbConn<'_>, req: &RequestCtx) -> Result<Value, AppError> {
        let id = id_value(&RequestValidator::require_id(&req.params)?);
        self.check_unique(conn, req, Some(&id)).await?;

        let mut data = req.params.as_map().clone();
        data.remove(ID_COLUMN);
        if let Some(col) = self.soft_delete_column() {
            data.remove(col);
        }
        self.keep_known_columns(&mut data);
        if data.is_empty() {
            return Ok(json!({ "affected": 0 }));
        }
        self.stamp(&mut data, &[&self.ctx.time.updated]);

        let sets: Vec<(String, Value)> = data.into_iter().collect();
        let mut conditions = vec![Condition::eq(ID_COLUMN, id)];
        conditions.extend(self.live_filter(None));
        let affected = conn
            .execute(&sql::update(conn.dialect(), self.dao.table(), &sets, &conditions))
            .await?;
        Ok(json!({ "affected": affected }))
    }

    /// One row by id, or `null`.
    pub async fn info(&self, conn: &mut DbConn<'_>, req: &RequestCtx) -> Result<Value, AppError> {
        self.run_before(req)?;
        let id = id_value(&RequestValidator::require_id(&req.params)?);
        let base = self.dao.query();
        let alias = base.alias_name().map(str::to_string);
        let mut q = base
            .filter(Condition::eq(qualify(alias.as_deref(), ID_COLUMN), id))
            .limit(1);
        if let Some(c) = self.live_filter(alias.as_deref()) {
            q = q.filter(c);
        }
        let row = conn.fetch_optional(&q.to_select(conn.dialect())).await?;
        Ok(match row {
            Some(Value::Object(mut map)) => {
                for field in &self.info_ignore {
                    map.remove(field);
                }
                Value::Object(map)
            }
            Some(other) => other,
            None => Value::Null,
        })
    }

    /// Build the filtered, ordered SELECT shared by List and Page, and the cache key components
    /// describing it. `or_where` applies only when `with_or_where` is set.
    fn build_select(
        &self,
        op: Option<&QueryOp>,
        req: &RequestCtx,
        with_or_where: bool,
    ) -> Result<(SelectQuery, PageCacheKey), AppError> {
        let params = &req.params;
        let mut key = PageCacheKey {
            route: req.route.clone(),
            ..Default::default()
        };
        let mut q = self.dao.query();

        let request_order = match (params.str("order"), params.str("sort")) {
            (Some(order), Some(sort)) => Some(parse_request_order(&order, &sort)?),
            _ => None,
        };
        let no_request_order = params.is_empty("order") && params.is_empty("sort");
        if let Some((field, direction)) = &request_order {
            q = q.order_by(field.clone(), *direction);
            key.request_order = format!("{}-{}", field, direction);
        }

        if let Some(op) = op {
            if let Some(alias) = &op.alias {
                q = q.alias(alias.clone());
            }
            if let Some(fields) = &op.select {
                q = q.fields(fields.clone());
            }
            for join in &op.joins {
                q = q.join(join.to_join());
            }
            for field in &op.field_eq {
                if let Some(v) = params.non_empty(field) {
                    key.field_eq.push(format!("{}-{}", field, value_text(v)));
                    q = q.where_field(field, v.clone());
                }
            }
            if let Some(keyword) = params.str("keyWord").map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
                if !op.keyword_fields.is_empty() {
                    let pattern = Value::String(format!("%{}%", keyword));
                    q = q.filter(Condition::AnyOf(
                        op.keyword_fields
                            .iter()
                            .map(|f| Condition::Cmp(f.clone(), CmpOp::Like, pattern.clone()))
                            .collect(),
                    ));
                }
                key.keyword = keyword;
            }
            for p in op.predicates(req) {
                if let Some(c) = p.condition() {
                    q = q.filter(c);
                }
                key.wheres.extend(p.key_fragment());
            }
            if with_or_where {
                let ors = op.or_predicates(req);
                q = q.filter(Condition::AnyOf(ors.iter().filter_map(Predicate::condition).collect()));
                key.or_wheres = ors.iter().filter_map(Predicate::key_fragment).collect();
            }
            if let Some(extend) = &op.extend {
                q = extend(req, q);
            }
            if no_request_order && !op.add_order_by.is_empty() {
                for (field, direction) in &op.add_order_by {
                    q = q.order_by(field.clone(), *direction);
                }
                key.default_order = op
                    .add_order_by
                    .iter()
                    .map(|(f, d)| format!("{}-{}", f, d))
                    .collect::<Vec<_>>()
                    .join(",");
            }
        }

        if let Some(c) = self.live_filter(q.alias_name()) {
            q = q.filter(c);
        }
        Ok((q, key))
    }

    fn finish(op: Option<&QueryOp>, req: &RequestCtx, data: Value) -> Value {
        match op.and_then(|o| o.modify_result.as_ref()) {
            Some(f) => f(req, data),
            None => data,
        }
    }

    /// All matching rows, capped at [`LIST_LIMIT`]. Never `null`.
    pub async fn list(&self, conn: &mut DbConn<'_>, req: &RequestCtx) -> Result<Value, AppError> {
        self.run_before(req)?;
        let op = self.list_op.as_deref();
        let (q, _) = self.build_select(op, req, false)?;
        let limit = q.limit_value().map_or(LIST_LIMIT, |n| n.min(LIST_LIMIT));
        let q = q.limit(limit);
        let rows = conn.fetch_all(&q.to_select(conn.dialect())).await?;
        Ok(Self::finish(op, req, Value::Array(rows)))
    }

    /// One page with `{list, pagination}`; in export mode `{list, total}` without paging.
    pub async fn page(&self, conn: &mut DbConn<'_>, req: &RequestCtx) -> Result<Value, AppError> {
        self.run_before(req)?;
        let params = &req.params;
        let page = params.i64("page").filter(|n| *n > 0).map_or(DEFAULT_PAGE, |n| n as u64);
        let size = params.i64("size").filter(|n| *n > 0).map_or(DEFAULT_SIZE, |n| n as u64);
        let op = self.page_op.as_deref();
        let (q, mut key) = self.build_select(op, req, true)?;
        key.page = page;
        key.size = size;
        let dialect = conn.dialect();

        let data = if params.bool("isExport") {
            let total = conn.fetch_count(&q.to_count(dialect)).await?;
            let q = match params.i64("maxExportLimit").filter(|n| *n > 0) {
                Some(max) => q.limit(max as u64),
                None => q,
            };
            let rows = conn.fetch_all(&q.to_select(dialect)).await?;
            json!({ "list": rows, "total": total })
        } else {
            let cache_key = key.to_key();
            match self.ctx.cache.get(&cache_key).await {
                Some(hit) => {
                    tracing::debug!(key = %cache_key, "db cache hit");
                    hit
                }
                None => {
                    let total = conn.fetch_count(&q.to_count(dialect)).await?;
                    let paged = q.limit(size).offset((page - 1).saturating_mul(size));
                    let rows = conn.fetch_all(&paged.to_select(dialect)).await?;
                    let envelope = json!({
                        "list": rows,
                        "pagination": { "page": page, "size": size, "total": total },
                    });
                    self.ctx.cache.insert(cache_key, envelope.clone()).await;
                    envelope
                }
            }
        };
        Ok(Self::finish(op, req, data))
    }

    /// Drop cached pages after a mutation on `req.route`.
    pub async fn cache_do(&self, req: &RequestCtx) -> Result<(), AppError> {
        let removed = self.ctx.cache.invalidate_all().await;
        if removed > 0 {
            tracing::debug!(route = %req.route, removed, "pages invalidated by mutation");
        }
        Ok(())
    }
}

impl std::fmt::Debug for CrudService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudService")
            .field("table", &self.dao.table())
            .field("group", &self.dao.group())
            .field("list_op", &self.list_op)
            .field("page_op", &self.page_op)
            .field("unique_keys", &self.unique_keys)
            .field("not_null_keys", &self.not_null_keys)
            .finish()
    }
}
