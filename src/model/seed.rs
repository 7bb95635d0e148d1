//! One-time initial data per (group, module, table), tracked in `base_sys_init`.

use super::{migration::create_table_sql, ColumnDef, ColumnKind, Model};
use crate::config::DEFAULT_GROUP;
use crate::db::{Database, DbConn};
use crate::error::{AppError, ConfigError};
use crate::id::IdGenerator;
use crate::sql::{self, Condition, SelectQuery};
use serde_json::Value;
use std::path::Path;

pub const INIT_TABLE: &str = "base_sys_init";

fn init_table_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", ColumnKind::String(64)),
        ColumnDef::new("group", ColumnKind::String(64)).not_null(),
        ColumnDef::new("module", ColumnKind::String(64)).not_null(),
        ColumnDef::new("tables", ColumnKind::Text),
    ]
}

async fn read_rows(path: &Path) -> Result<Vec<Value>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let parsed: Value =
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
    Ok(match parsed {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

/// Insert `<dir>/<table>.json` into the model's table unless this (group, module, table) was seeded before.
/// Returns whether rows were written.
pub async fn fill_init_data(
    db: &Database,
    ids: &IdGenerator,
    dir: &Path,
    module: &str,
    model: &dyn Model,
) -> Result<bool, AppError> {
    let table = model.table_name();
    let group = model.group_name();

    let meta = db.group(DEFAULT_GROUP)?;
    let existing = {
        let mut pooled = meta.pool.acquire().await?;
        let mut conn = DbConn::new(&mut *pooled, meta);
        conn.execute_ddl(&create_table_sql(INIT_TABLE, &init_table_columns(), meta.dialect))
            .await?;
        let lookup = SelectQuery::table(INIT_TABLE)
            .where_field("group", group)
            .where_field("module", module)
            .to_select(meta.dialect);
        conn.fetch_optional(&lookup).await?
    };
    let mut seeded: Vec<String> = existing
        .as_ref()
        .and_then(|row| row.get("tables"))
        .and_then(Value::as_str)
        .map(|s| s.split(',').filter(|t| !t.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();
    if seeded.iter().any(|t| t == table) {
        tracing::debug!(group, module, table, "init data already written, skipping");
        return Ok(false);
    }

    let rows = read_rows(&dir.join(format!("{}.json", table))).await?;
    if rows.is_empty() {
        tracing::debug!(group, module, table, "no init data");
        return Ok(false);
    }

    let target = db.group(group)?;
    let mut tx = target.pool.begin().await?;
    {
        let mut conn = DbConn::new(&mut *tx, target);
        for row in rows {
            let Value::Object(map) = row else {
                return Err(ConfigError::Invalid(format!("init data for {} must be objects", table)).into());
            };
            let mut cols: Vec<(String, Value)> = map.into_iter().collect();
            if !cols.iter().any(|(k, _)| k == "id") {
                cols.insert(0, ("id".to_string(), Value::String(ids.next_id())));
            }
            conn.execute(&sql::insert(target.dialect, table, &cols)).await?;
        }
    }
    tx.commit().await?;

    seeded.push(table.to_string());
    let tables = Value::String(seeded.join(","));
    let q = match existing {
        Some(_) => sql::update(
            meta.dialect,
            INIT_TABLE,
            &[("tables".to_string(), tables)],
            &[Condition::eq("group", group), Condition::eq("module", module)],
        ),
        None => sql::insert(
            meta.dialect,
            INIT_TABLE,
            &[
                ("id".to_string(), Value::String(ids.next_id())),
                ("group".to_string(), Value::String(group.to_string())),
                ("module".to_string(), Value::String(module.to_string())),
                ("tables".to_string(), tables),
            ],
        ),
    };
    let mut pooled = meta.pool.acquire().await?;
    DbConn::new(&mut *pooled, meta).execute(&q).await?;
    tracing::info!(group, module, table, "init data written");
    Ok(true)
}
