//! Table-backed entity types and the registry that migrates and describes them.

mod migration;
pub mod seed;

pub use migration::{apply_migrations, create_table_sql};

use crate::config::{TimeColumns, DEFAULT_GROUP};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Primary key column present on every table.
pub const ID_COLUMN: &str = "id";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// VARCHAR(n).
    String(u32),
    Text,
    Int,
    BigInt,
    Float,
    Bool,
    /// Stored as `YYYY-MM-DD HH:MM:SS` text.
    DateTime,
}

impl ColumnKind {
    /// Name reported by `/eps`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnKind::String(_) => "varchar",
            ColumnKind::Text => "text",
            ColumnKind::Int => "int",
            ColumnKind::BigInt => "bigint",
            ColumnKind::Float => "float",
            ColumnKind::Bool => "bool",
            ColumnKind::DateTime => "datetime",
        }
    }

    fn length(&self) -> String {
        match self {
            ColumnKind::String(n) => n.to_string(),
            ColumnKind::DateTime => "32".to_string(),
            _ => String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unique: bool,
    /// SQL literal used as the column default.
    pub default: Option<String>,
    pub comment: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        ColumnDef {
            name: name.into(),
            kind,
            nullable: true,
            unique: false,
            default: None,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_sql(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A persisted entity type. The `id` column and the managed time columns are implicit.
pub trait Model: Send + Sync + 'static {
    fn table_name(&self) -> &str;

    fn group_name(&self) -> &str {
        DEFAULT_GROUP
    }

    fn columns(&self) -> Vec<ColumnDef>;
}

/// Every column the table carries: id, declared columns, then managed time columns not already declared.
pub fn all_columns(model: &dyn Model, time: &TimeColumns) -> Vec<ColumnDef> {
    let declared = model.columns();
    let mut out = Vec::with_capacity(declared.len() + 4);
    out.push(ColumnDef::new(ID_COLUMN, ColumnKind::String(64)).not_null().comment("ID"));
    out.extend(declared.into_iter().filter(|c| c.name != ID_COLUMN));
    let managed = [Some(&time.created), Some(&time.updated), time.deleted.as_ref()];
    for name in managed.into_iter().flatten() {
        if !name.is_empty() && !out.iter().any(|c| &c.name == name) {
            out.push(ColumnDef::new(name.clone(), ColumnKind::DateTime));
        }
    }
    out
}

/// Column metadata served at `/eps`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub comment: String,
    pub length: String,
    pub nullable: bool,
    pub property_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Column list of a model, soft-delete column excluded.
pub fn model_info(model: &dyn Model, time: &TimeColumns) -> Vec<ColumnInfo> {
    all_columns(model, time)
        .into_iter()
        .filter(|c| time.deleted.as_deref() != Some(c.name.as_str()))
        .map(|c| ColumnInfo {
            comment: c.comment.clone().unwrap_or_else(|| c.name.clone()),
            length: c.kind.length(),
            nullable: c.nullable,
            property_name: c.name,
            type_name: c.kind.type_name().to_string(),
        })
        .collect()
}

/// Models known to the application, in registration order.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: Vec<Arc<dyn Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model; registering the same table in the same group twice is a no-op.
    pub fn register(&mut self, model: Arc<dyn Model>) {
        let exists = self
            .models
            .iter()
            .any(|m| m.table_name() == model.table_name() && m.group_name() == model.group_name());
        if !exists {
            tracing::debug!(table = %model.table_name(), group = %model.group_name(), "model registered");
            self.models.push(model);
        }
    }

    pub fn models(&self) -> &[Arc<dyn Model>] {
        &self.models
    }

    pub fn get(&self, table: &str) -> Option<&Arc<dyn Model>> {
        self.models.iter().find(|m| m.table_name() == table)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Route prefix → column metadata.
pub type EpsInfo = BTreeMap<String, Vec<ColumnInfo>>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Goods;

    impl Model for Goods {
        fn table_name(&self) -> &str {
            "demo_goods"
        }

        fn columns(&self) -> Vec<ColumnDef> {
            vec![
                ColumnDef::new("title", ColumnKind::String(100)).not_null().comment("标题"),
                ColumnDef::new("price", ColumnKind::Float),
                ColumnDef::new("updateTime", ColumnKind::DateTime),
            ]
        }
    }

    fn time_with_soft_delete() -> TimeColumns {
        TimeColumns {
            deleted: Some("deleteTime".into()),
            ..TimeColumns::default()
        }
    }

    #[test]
    fn all_columns_adds_id_and_missing_time_columns_once() {
        let names: Vec<String> = all_columns(&Goods, &time_with_soft_delete())
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["id", "title", "price", "updateTime", "createTime", "deleteTime"]);
    }

    #[test]
    fn model_info_hides_soft_delete_column() {
        let info = model_info(&Goods, &time_with_soft_delete());
        assert!(info.iter().all(|c| c.property_name != "deleteTime"));
        let title = info.iter().find(|c| c.property_name == "title").unwrap();
        assert_eq!(title.comment, "标题");
        assert_eq!(title.length, "100");
        assert!(!title.nullable);
        let json = serde_json::to_value(title).unwrap();
        assert_eq!(json["propertyName"], "title");
        assert_eq!(json["type"], "varchar");
    }

    #[test]
    fn registry_ignores_duplicates() {
        let mut reg = ModelRegistry::new();
        reg.register(Arc::new(Goods));
        reg.register(Arc::new(Goods));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("demo_goods").map(|m| m.group_name()), Some("default"));
    }
}
