//! CREATE TABLE IF NOT EXISTS for registered models, one connection group at a time.

use super::{all_columns, ColumnDef, ColumnKind, ModelRegistry, ID_COLUMN};
use crate::config::TimeColumns;
use crate::db::{Database, DbConn, Dialect};
use crate::error::AppError;

fn sql_type(kind: ColumnKind, dialect: Dialect) -> String {
    match (kind, dialect) {
        (ColumnKind::String(n), _) => format!("VARCHAR({})", n),
        (ColumnKind::DateTime, _) => "VARCHAR(32)".into(),
        (ColumnKind::Text, _) => "TEXT".into(),
        (ColumnKind::Int | ColumnKind::BigInt | ColumnKind::Bool, Dialect::Sqlite) => "INTEGER".into(),
        (ColumnKind::Float, Dialect::Sqlite) => "REAL".into(),
        (ColumnKind::Int, Dialect::MySql) => "INT".into(),
        (ColumnKind::Int | ColumnKind::BigInt, _) => "BIGINT".into(),
        (ColumnKind::Float, Dialect::MySql) => "DOUBLE".into(),
        (ColumnKind::Float, Dialect::Postgres) => "DOUBLE PRECISION".into(),
        (ColumnKind::Bool, Dialect::MySql) => "TINYINT(1)".into(),
        (ColumnKind::Bool, Dialect::Postgres) => "BOOLEAN".into(),
    }
}

fn column_sql(c: &ColumnDef, dialect: Dialect) -> String {
    let mut def = format!("{} {}", dialect.quote_ident(&c.name), sql_type(c.kind, dialect));
    if c.name == ID_COLUMN {
        def.push_str(" NOT NULL PRIMARY KEY");
        return def;
    }
    if !c.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = &c.default {
        def.push_str(" DEFAULT ");
        def.push_str(d);
    }
    if c.unique {
        def.push_str(" UNIQUE");
    }
    def
}

/// DDL for one table.
pub fn create_table_sql(table: &str, columns: &[ColumnDef], dialect: Dialect) -> String {
    let cols: Vec<String> = columns.iter().map(|c| column_sql(c, dialect)).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        dialect.quote_ident(table),
        cols.join(", ")
    )
}

/// Create every registered model's table if missing. Existing tables are left untouched.
pub async fn apply_migrations(db: &Database, models: &ModelRegistry, time: &TimeColumns) -> Result<(), AppError> {
    for model in models.models() {
        let group = db.group(model.group_name())?;
        let mut pooled = group.pool.acquire().await?;
        let mut conn = DbConn::new(&mut *pooled, group);
        let columns = all_columns(model.as_ref(), time);
        let sql = create_table_sql(model.table_name(), &columns, group.dialect);
        conn.execute_ddl(&sql).await?;
        tracing::info!(table = %model.table_name(), group = %model.group_name(), "table ensured");
    }
    Ok(())
}
