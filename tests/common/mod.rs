#![allow(dead_code)]

use admin_scaffold::config::{CacheConfig, CoreConfig, TimeColumns, DEFAULT_GROUP};
use admin_scaffold::db::{Database, DbGroup, Dialect};
use admin_scaffold::model::{apply_migrations, ColumnDef, ColumnKind, Model, ModelRegistry};
use admin_scaffold::service::{DbCache, ServiceContext};
use admin_scaffold::IdGenerator;
use sqlx::any::AnyPoolOptions;
use std::sync::Arc;

pub const GOODS: &str = "demo_goods";

/// Fixture entity: a titled product with a price and a status.
pub struct Goods;

impl Model for Goods {
    fn table_name(&self) -> &str {
        GOODS
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("title", ColumnKind::String(100)).not_null().unique(),
            ColumnDef::new("price", ColumnKind::Float),
            ColumnDef::new("status", ColumnKind::Int).default_sql("1"),
            ColumnDef::new("secret", ColumnKind::String(64)),
            ColumnDef::new("typeId", ColumnKind::String(64)),
        ]
    }
}

pub const GOODS_TYPE: &str = "demo_goods_type";

/// Category that goods point at through `typeId`.
pub struct GoodsType;

impl Model for GoodsType {
    fn table_name(&self) -> &str {
        GOODS_TYPE
    }

    fn columns(&self) -> Vec<ColumnDef> {
        vec![ColumnDef::new("name", ColumnKind::String(50)).not_null()]
    }
}

/// One shared in-memory sqlite connection; it lives as long as the pool.
pub async fn memory_db() -> Database {
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    Database::from_pool(DEFAULT_GROUP, pool, Dialect::Sqlite)
}

pub fn time_columns(soft_delete: bool) -> TimeColumns {
    let mut core = CoreConfig::default();
    if soft_delete {
        core.delete_time_field = "deleteTime".into();
    }
    TimeColumns::from(&core)
}

pub fn context(cache: bool, soft_delete: bool) -> ServiceContext {
    let cache = DbCache::new(&CacheConfig {
        enable: cache,
        ..CacheConfig::default()
    });
    ServiceContext::new(Arc::new(IdGenerator::new(7)), cache, time_columns(soft_delete))
}

/// Fresh database with the goods table created.
pub async fn goods_db(soft_delete: bool) -> Database {
    let db = memory_db().await;
    let mut models = ModelRegistry::new();
    models.register(Arc::new(Goods));
    apply_migrations(&db, &models, &time_columns(soft_delete)).await.unwrap();
    db
}

pub fn default_group(db: &Database) -> &DbGroup {
    db.group(DEFAULT_GROUP).unwrap()
}

/// `count` rows titled `goods <n>` with price `n` and status `n % 2`, inserted by one statement.
pub fn seed_sql(count: u64) -> String {
    format!(
        "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < {count}) \
         INSERT INTO \"{GOODS}\" (\"id\", \"title\", \"price\", \"status\", \"createTime\", \"updateTime\") \
         SELECT 'g' || x, 'goods ' || x, x, x % 2, '2024-01-01 00:00:00', '2024-01-01 00:00:00' FROM n"
    )
}
