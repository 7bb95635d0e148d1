//! Demo admin backend: one addon ("demo") with goods and goods types on top of admin-scaffold.
//!
//! Run from this directory: `cargo run`
//! Config is read from `config/config.toml` (override with `APP_CONFIG`), `.env` and env vars;
//! initial data comes from `data/`.

use admin_scaffold::addon::{Addon, AddonContext, AddonRegistry};
use admin_scaffold::config;
use admin_scaffold::controller::{Controller, ControllerSimple};
use admin_scaffold::db::DbConn;
use admin_scaffold::error::AppError;
use admin_scaffold::func::CoreFunc;
use admin_scaffold::model::{ColumnDef, ColumnKind, Model};
use admin_scaffold::query::{JoinOp, Predicate, QueryOp};
use admin_scaffold::request::Params;
use admin_scaffold::service::{Api, CrudService, ServiceHooks};
use admin_scaffold::sql::{Direction, JoinType};
use admin_scaffold::response::ok;
use admin_scaffold::{logging, AppState};
use async_trait::async_trait;
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

struct Goods;

impl Model for Goods {
    fn table_name(&self) -> &str {
        "demo_goods"
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("title", ColumnKind::String(100)).not_null().unique().comment("标题"),
            ColumnDef::new("price", ColumnKind::Float).default_sql("0").comment("价格"),
            ColumnDef::new("status", ColumnKind::Int).default_sql("1").comment("状态 0:下架 1:上架"),
            ColumnDef::new("typeId", ColumnKind::String(64)).comment("分类ID"),
            ColumnDef::new("remark", ColumnKind::Text).comment("备注"),
            ColumnDef::new("createBy", ColumnKind::String(64)),
        ]
    }
}

struct GoodsType;

impl Model for GoodsType {
    fn table_name(&self) -> &str {
        "demo_goods_type"
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![ColumnDef::new("name", ColumnKind::String(50)).not_null().unique().comment("名称")]
    }
}

/// Refuses to delete goods types that still have goods.
struct GoodsTypeHooks;

#[async_trait]
impl ServiceHooks for GoodsTypeHooks {
    async fn modify_before(&self, conn: &mut DbConn<'_>, api: Api, params: &Params) -> Result<(), AppError> {
        if api != Api::Delete {
            return Ok(());
        }
        let ids = params.ids();
        if ids.is_empty() {
            return Ok(());
        }
        let q = admin_scaffold::sql::SelectQuery::table("demo_goods")
            .where_in("typeId", ids)
            .where_field("deleteTime", Value::Null)
            .to_count(conn.dialect());
        if conn.fetch_count(&q).await? > 0 {
            return Err(AppError::Validation("分类下存在商品，无法删除".into()));
        }
        Ok(())
    }
}

/// `report(<label>)`: writes a labelled report line to the log.
struct Report;

#[async_trait]
impl CoreFunc for Report {
    async fn func(&self, param: &str) -> Result<(), AppError> {
        tracing::info!(label = %param, "demo report requested");
        Ok(())
    }

    fn is_singleton(&self) -> bool {
        true
    }
}

struct DemoAddon;

impl DemoAddon {
    fn goods_page() -> QueryOp {
        QueryOp::new()
            .alias("a")
            .select("a.*, b.name AS typeName")
            .join(JoinOp::from_model(&GoodsType, "b", "a.typeId = b.id", JoinType::Left))
            .field_eq(["status", "typeId"])
            .keyword_fields(["a.title", "a.remark"])
            .where_fn(|req| vec![Predicate::eq_if("a.status", 1, req.params.bool("onSale"))])
            .order_by("a.createTime", Direction::Desc)
    }
}

impl Addon for DemoAddon {
    fn name(&self) -> &str {
        "demo"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&self, ctx: &mut AddonContext) -> Result<(), AppError> {
        let services = ctx.services().clone();
        let goods = Arc::new(Goods);
        let goods_type = Arc::new(GoodsType);

        let goods_service = CrudService::for_model(goods.clone(), services.clone())
            .unique_key("title", "标题已存在")
            .not_null_key("title", "标题不能为空")
            .insert_param(|_| {
                let mut m = Map::new();
                m.insert("createBy".into(), json!("demo-admin"));
                m
            })
            .info_ignore(["createBy"])
            .list_query(QueryOp::new().field_eq(["status", "typeId"]).order_by("price", Direction::Asc))
            .page_query(Self::goods_page());
        ctx.add_controller(Controller::new("/admin/demo/goods", goods_service));

        let type_service = CrudService::for_model(goods_type.clone(), services)
            .unique_key("name", "名称已存在")
            .not_null_key("name", "名称不能为空")
            .hooks(Arc::new(GoodsTypeHooks));
        ctx.add_controller(Controller::new("/admin/demo/goods_type", type_service));

        // Public, read-only surface.
        let app_service = CrudService::for_model(goods.clone(), ctx.services().clone())
            .list_query(QueryOp::new().where_fn(|_| vec![Predicate::eq("status", 1)]));
        ctx.add_controller(Controller::new("/app/demo/goods", app_service).api([Api::Info, Api::List]));

        ctx.add_simple(ControllerSimple::new(
            "/admin/demo/stats",
            Router::new().route("/models", get(models)).route("/run", post(run_func)),
        ));
        ctx.register_func("report", Arc::new(Report));

        ctx.seed("demo", "data", goods_type);
        ctx.seed("demo", "data", goods);
        Ok(())
    }
}

async fn models(State(state): State<AppState>) -> Json<Value> {
    let tables: Vec<&str> = state.models.models().iter().map(|m| m.table_name()).collect();
    Json(json!({ "tables": tables }))
}

/// Body `{"call": "report(nightly)"}`.
async fn run_func(State(state): State<AppState>, Json(body): Json<Value>) -> Result<impl IntoResponse, AppError> {
    let call = body
        .get("call")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("call is required".into()))?;
    let ran = state.funcs.cluster_run(call).await?;
    Ok(ok(&state.config.core.success_message, json!({ "ran": ran })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load()?;
    let _guard = logging::init(&config.logger)?;

    let addons = AddonRegistry::new().add(DemoAddon);
    let address = config.server.address.clone();
    let (app, state) = admin_scaffold::build_from_config(config, &addons).await?;
    tracing::info!(app = %state.config.core.app_name, models = state.models.len(), "demo admin ready");
    admin_scaffold::serve(app, &address).await?;
    Ok(())
}
