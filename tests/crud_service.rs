mod common;

use admin_scaffold::db::{DbConn, Dialect};
use admin_scaffold::error::AppError;
use admin_scaffold::model::{apply_migrations, ModelRegistry};
use admin_scaffold::query::{JoinOp, Predicate, QueryOp};
use admin_scaffold::request::RequestCtx;
use admin_scaffold::service::{CrudService, ID_REQUIRED, LIST_LIMIT};
use admin_scaffold::sql::{Direction, JoinType, SelectQuery};
use common::{context, default_group, goods_db, seed_sql, time_columns, Goods, GoodsType, GOODS};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const ADD: &str = "/admin/demo/goods/add";
const PAGE: &str = "/admin/demo/goods/page";
const LIST: &str = "/admin/demo/goods/list";

fn goods_service(cache: bool, soft_delete: bool) -> CrudService {
    CrudService::for_model(Arc::new(Goods), context(cache, soft_delete))
}

async fn total_rows(conn: &mut DbConn<'_>) -> u64 {
    conn.fetch_count(&SelectQuery::table(GOODS).to_count(Dialect::Sqlite))
        .await
        .unwrap()
}

fn titles(rows: &Value) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn add_stamps_id_and_time_columns() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    let svc = goods_service(false, false);

    let added = svc
        .add(&mut conn, &RequestCtx::new(ADD, json!({"title": "pen", "price": 2.5, "bogus": 1})))
        .await
        .unwrap();
    let id = added["id"].as_str().unwrap().to_string();
    assert!(id.parse::<u64>().is_ok());

    let row = svc
        .info(&mut conn, &RequestCtx::new("/admin/demo/goods/info", json!({"id": id})))
        .await
        .unwrap();
    assert_eq!(row["title"], "pen");
    assert_eq!(row["price"], 2.5);
    assert_eq!(row["status"], 1);
    assert_eq!(row["createTime"].as_str().unwrap().len(), 19);
    assert!(row.get("bogus").is_none());
}

#[tokio::test]
async fn add_without_required_field_inserts_nothing() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    let svc = goods_service(false, false).not_null_key("title", "标题不能为空");

    let before = total_rows(&mut conn).await;
    for params in [json!({"price": 1}), json!({"title": null, "price": 1})] {
        let err = svc.add(&mut conn, &RequestCtx::new(ADD, params)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "标题不能为空"));
    }
    assert_eq!(total_rows(&mut conn).await, before);
}

#[tokio::test]
async fn unique_keys_reject_duplicates_but_not_the_row_itself() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    let svc = goods_service(false, false).unique_key("title", "标题已存在");

    let pen = svc.add(&mut conn, &RequestCtx::new(ADD, json!({"title": "pen"}))).await.unwrap();
    svc.add(&mut conn, &RequestCtx::new(ADD, json!({"title": "ink"}))).await.unwrap();

    let err = svc.add(&mut conn, &RequestCtx::new(ADD, json!({"title": "pen"}))).await.unwrap_err();
    assert_eq!(err.to_string(), "标题已存在");

    let update = "/admin/demo/goods/update";
    let err = svc
        .update(&mut conn, &RequestCtx::new(update, json!({"id": pen["id"], "title": "ink"})))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let same = svc
        .update(&mut conn, &RequestCtx::new(update, json!({"id": pen["id"], "title": "pen", "price": 3})))
        .await
        .unwrap();
    assert_eq!(same["affected"], 1);
}

#[tokio::test]
async fn delete_of_missing_ids_is_idempotent() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(3)).await.unwrap();
    let svc = goods_service(false, false);
    let req = RequestCtx::new("/admin/demo/goods/delete", json!({"ids": ["nope"]}));

    for _ in 0..2 {
        let res = svc.delete(&mut conn, &req).await.unwrap();
        assert_eq!(res["affected"], 0);
    }
    let res = svc
        .delete(&mut conn, &RequestCtx::new("/admin/demo/goods/delete", json!({"ids": "g1,g2"})))
        .await
        .unwrap();
    assert_eq!(res["affected"], 2);
    assert_eq!(total_rows(&mut conn).await, 1);

    let none = svc
        .delete(&mut conn, &RequestCtx::new("/admin/demo/goods/delete", json!({})))
        .await
        .unwrap();
    assert_eq!(none["affected"], 0);
    assert_eq!(total_rows(&mut conn).await, 1);
}

#[tokio::test]
async fn update_without_id_fails_and_writes_nothing() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(3)).await.unwrap();
    let svc = goods_service(false, false);

    let err = svc
        .update(&mut conn, &RequestCtx::new("/admin/demo/goods/update", json!({"title": "changed"})))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == ID_REQUIRED));
    let changed = conn
        .fetch_count(&SelectQuery::table(GOODS).where_field("title", "changed").to_count(Dialect::Sqlite))
        .await
        .unwrap();
    assert_eq!(changed, 0);
}

#[tokio::test]
async fn list_is_capped() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(LIST_LIMIT + 1)).await.unwrap();
    let svc = goods_service(false, false);

    let rows = svc.list(&mut conn, &RequestCtx::new(LIST, json!({}))).await.unwrap();
    assert_eq!(rows.as_array().unwrap().len() as u64, LIST_LIMIT);
}

#[tokio::test]
async fn list_without_matches_is_an_empty_array() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    let svc = goods_service(false, false);

    let rows = svc.list(&mut conn, &RequestCtx::new(LIST, json!({}))).await.unwrap();
    assert_eq!(rows, json!([]));
    let row = svc
        .info(&mut conn, &RequestCtx::new("/admin/demo/goods/info", json!({"id": "missing"})))
        .await
        .unwrap();
    assert!(row.is_null());
}

#[tokio::test]
async fn page_normalizes_non_positive_page_and_size() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(25)).await.unwrap();
    let svc = goods_service(false, false);

    let res = svc
        .page(&mut conn, &RequestCtx::new(PAGE, json!({"page": 0, "size": -5})))
        .await
        .unwrap();
    assert_eq!(res["pagination"], json!({"page": 1, "size": 10, "total": 25}));
    assert_eq!(res["list"].as_array().unwrap().len(), 10);

    let res = svc
        .page(&mut conn, &RequestCtx::new(PAGE, json!({"page": "3", "size": "10"})))
        .await
        .unwrap();
    assert_eq!(res["list"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn export_returns_capped_list_and_total_without_pagination() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(200)).await.unwrap();
    let svc = goods_service(false, false);

    let res = svc
        .page(&mut conn, &RequestCtx::new(PAGE, json!({"isExport": true, "maxExportLimit": 50})))
        .await
        .unwrap();
    assert_eq!(res["list"].as_array().unwrap().len(), 50);
    assert_eq!(res["total"], 200);
    assert!(res.get("pagination").is_none());
}

#[tokio::test]
async fn request_order_beats_default_order() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(5)).await.unwrap();
    let op = QueryOp::new().order_by("price", Direction::Desc);
    let svc = goods_service(false, false).list_query(op.clone()).page_query(op);

    let rows = svc.list(&mut conn, &RequestCtx::new(LIST, json!({}))).await.unwrap();
    assert_eq!(titles(&rows)[0], "goods 5");

    let rows = svc
        .list(&mut conn, &RequestCtx::new(LIST, json!({"order": "price", "sort": "asc"})))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["goods 1", "goods 2", "goods 3", "goods 4", "goods 5"]);

    let page = svc
        .page(&mut conn, &RequestCtx::new(PAGE, json!({"order": "price", "sort": "asc"})))
        .await
        .unwrap();
    assert_eq!(titles(&page["list"])[0], "goods 1");

    let err = svc
        .list(&mut conn, &RequestCtx::new(LIST, json!({"order": "price; drop", "sort": "asc"})))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn field_eq_keyword_and_where_predicates_filter_rows() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(12)).await.unwrap();
    let op = QueryOp::new()
        .field_eq(["status"])
        .keyword_fields(["title"])
        .order_by("price", Direction::Asc)
        .where_fn(|req| {
            vec![
                Predicate::raw("price < 12"),
                Predicate::eq_if("price", 1, req.params.bool("onlyFirst")),
            ]
        });
    let svc = goods_service(false, false).list_query(op);

    let rows = svc.list(&mut conn, &RequestCtx::new(LIST, json!({"status": 0}))).await.unwrap();
    assert_eq!(titles(&rows), vec!["goods 2", "goods 4", "goods 6", "goods 8", "goods 10"]);

    let rows = svc
        .list(&mut conn, &RequestCtx::new(LIST, json!({"status": "", "keyWord": " goods 1 "})))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["goods 1", "goods 10", "goods 11"]);

    let rows = svc
        .list(&mut conn, &RequestCtx::new(LIST, json!({"onlyFirst": true})))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["goods 1"]);
}

#[tokio::test]
async fn page_applies_or_where_and_list_ignores_it() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(5)).await.unwrap();
    let op = QueryOp::new().or_where_fn(|_| vec![Predicate::eq("title", "goods 1"), Predicate::eq("title", "goods 2")]);
    let svc = goods_service(false, false).list_query(op.clone()).page_query(op);

    let page = svc.page(&mut conn, &RequestCtx::new(PAGE, json!({}))).await.unwrap();
    assert_eq!(page["pagination"]["total"], 2);
    let rows = svc.list(&mut conn, &RequestCtx::new(LIST, json!({}))).await.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn hooks_and_descriptor_callbacks() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    let svc = goods_service(false, false)
        .insert_param(|_| {
            let mut m = Map::new();
            m.insert("status".into(), json!(9));
            m
        })
        .info_ignore(["secret"])
        .before(|req| {
            if req.params.is_empty("tenant") {
                Err(AppError::Validation("tenant required".into()))
            } else {
                Ok(())
            }
        })
        .list_query(QueryOp::new().modify_result(|_, rows| json!({ "count": rows.as_array().map_or(0, Vec::len) })));

    let added = svc
        .add(&mut conn, &RequestCtx::new(ADD, json!({"title": "pen", "status": 1, "secret": "s3"})))
        .await
        .unwrap();

    let err = svc
        .info(&mut conn, &RequestCtx::new("/admin/demo/goods/info", json!({"id": added["id"]})))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "tenant required");

    let row = svc
        .info(
            &mut conn,
            &RequestCtx::new("/admin/demo/goods/info", json!({"id": added["id"], "tenant": "t1"})),
        )
        .await
        .unwrap();
    assert_eq!(row["status"], 9);
    assert!(row.get("secret").is_none());

    let listed = svc.list(&mut conn, &RequestCtx::new(LIST, json!({"tenant": "t1"}))).await.unwrap();
    assert_eq!(listed, json!({"count": 1}));
}

#[tokio::test]
async fn soft_delete_hides_rows_from_reads() {
    let db = goods_db(true).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    let svc = goods_service(false, true);

    let added = svc.add(&mut conn, &RequestCtx::new(ADD, json!({"title": "pen"}))).await.unwrap();
    svc.add(&mut conn, &RequestCtx::new(ADD, json!({"title": "ink"}))).await.unwrap();
    let del = RequestCtx::new("/admin/demo/goods/delete", json!({"ids": [added["id"]]}));
    assert_eq!(svc.delete(&mut conn, &del).await.unwrap()["affected"], 1);
    assert_eq!(svc.delete(&mut conn, &del).await.unwrap()["affected"], 0);

    assert_eq!(total_rows(&mut conn).await, 2);
    let info = svc
        .info(&mut conn, &RequestCtx::new("/admin/demo/goods/info", json!({"id": added["id"]})))
        .await
        .unwrap();
    assert!(info.is_null());
    let rows = svc.list(&mut conn, &RequestCtx::new(LIST, json!({}))).await.unwrap();
    assert_eq!(titles(&rows), vec!["ink"]);
    let page = svc.page(&mut conn, &RequestCtx::new(PAGE, json!({}))).await.unwrap();
    assert_eq!(page["pagination"]["total"], 1);
    let upd = svc
        .update(
            &mut conn,
            &RequestCtx::new("/admin/demo/goods/update", json!({"id": added["id"], "price": 4})),
        )
        .await
        .unwrap();
    assert_eq!(upd["affected"], 0);
}

#[tokio::test]
async fn page_cache_serves_until_a_mutation_invalidates_it() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(3)).await.unwrap();
    let ctx = context(true, false);
    let cache = ctx.cache.clone();
    let svc = CrudService::for_model(Arc::new(Goods), ctx)
        .page_query(QueryOp::new().keyword_fields(["title"]).field_eq(["status"]));

    let req = RequestCtx::new(PAGE, json!({"page": 1, "size": 10}));
    assert_eq!(svc.page(&mut conn, &req).await.unwrap()["pagination"]["total"], 3);
    svc.page(&mut conn, &RequestCtx::new(PAGE, json!({"size": 10, "page": 1})))
        .await
        .unwrap();
    assert_eq!(cache.keys().len(), 1);

    svc.page(&mut conn, &RequestCtx::new(PAGE, json!({"page": 1, "size": 10, "keyWord": "goods 1"})))
        .await
        .unwrap();
    svc.page(&mut conn, &RequestCtx::new(PAGE, json!({"page": 1, "size": 10, "status": 1})))
        .await
        .unwrap();
    assert_eq!(cache.keys().len(), 3);

    conn.execute_ddl(&format!(
        "INSERT INTO \"{GOODS}\" (\"id\", \"title\") VALUES ('x1', 'fresh')"
    ))
    .await
    .unwrap();
    assert_eq!(svc.page(&mut conn, &req).await.unwrap()["pagination"]["total"], 3);

    svc.cache_do(&RequestCtx::new(ADD, json!({}))).await.unwrap();
    assert!(cache.keys().is_empty());
    assert_eq!(svc.page(&mut conn, &req).await.unwrap()["pagination"]["total"], 4);
}

#[tokio::test]
async fn updating_a_joined_table_refreshes_cached_pages() {
    let db = goods_db(false).await;
    let mut models = ModelRegistry::new();
    models.register(Arc::new(GoodsType));
    apply_migrations(&db, &models, &time_columns(false)).await.unwrap();
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    let ctx = context(true, false);
    let cache = ctx.cache.clone();
    let types = CrudService::for_model(Arc::new(GoodsType), ctx.clone());
    let goods = CrudService::for_model(Arc::new(Goods), ctx).page_query(
        QueryOp::new()
            .alias("a")
            .select("a.*, b.name AS typeName")
            .join(JoinOp::from_model(&GoodsType, "b", "a.typeId = b.id", JoinType::Left)),
    );

    let added = types
        .add(&mut conn, &RequestCtx::new("/admin/demo/goods_type/add", json!({"name": "old"})))
        .await
        .unwrap();
    let type_id = added["id"].clone();
    goods
        .add(&mut conn, &RequestCtx::new(ADD, json!({"title": "pen", "typeId": type_id})))
        .await
        .unwrap();

    let req = RequestCtx::new(PAGE, json!({"page": 1, "size": 10}));
    assert_eq!(goods.page(&mut conn, &req).await.unwrap()["list"][0]["typeName"], "old");
    assert_eq!(cache.keys().len(), 1);

    let update = RequestCtx::new("/admin/demo/goods_type/update", json!({"id": type_id, "name": "new"}));
    types.update(&mut conn, &update).await.unwrap();
    types.cache_do(&update).await.unwrap();
    assert!(cache.keys().is_empty());
    assert_eq!(goods.page(&mut conn, &req).await.unwrap()["list"][0]["typeName"], "new");
}

#[tokio::test]
async fn export_bypasses_the_cache() {
    let db = goods_db(false).await;
    let group = default_group(&db);
    let mut pooled = group.pool.acquire().await.unwrap();
    let mut conn = DbConn::new(&mut *pooled, group);
    conn.execute_ddl(&seed_sql(2)).await.unwrap();
    let ctx = context(true, false);
    let cache = ctx.cache.clone();
    let svc = CrudService::for_model(Arc::new(Goods), ctx);

    let res = svc
        .page(&mut conn, &RequestCtx::new(PAGE, json!({"isExport": "true"})))
        .await
        .unwrap();
    assert_eq!(res["total"], 2);
    assert!(cache.keys().is_empty());
}
