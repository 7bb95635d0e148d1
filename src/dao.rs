//! Table handles: which table, which connection group, which columns, and the base SELECT.

use crate::config::{TimeColumns, DEFAULT_GROUP};
use crate::model::{all_columns, Model};
use crate::sql::SelectQuery;
use std::sync::Arc;

/// Per-entity handle built once at init. Carries no per-request state.
pub trait Dao: Send + Sync {
    fn table(&self) -> &str;

    fn group(&self) -> &str {
        DEFAULT_GROUP
    }

    /// Known columns; empty means unknown and disables column filtering.
    fn columns(&self) -> &[String] {
        &[]
    }

    /// Starting point for reads. Override for custom views.
    fn query(&self) -> SelectQuery {
        SelectQuery::table(self.table())
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns().iter().any(|c| c == name)
    }
}

/// Dao derived from a registered model.
pub struct ModelDao {
    model: Arc<dyn Model>,
    columns: Vec<String>,
}

impl ModelDao {
    pub fn new(model: Arc<dyn Model>, time: &TimeColumns) -> Self {
        let columns = all_columns(model.as_ref(), time).into_iter().map(|c| c.name).collect();
        ModelDao { model, columns }
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }
}

impl Dao for ModelDao {
    fn table(&self) -> &str {
        self.model.table_name()
    }

    fn group(&self) -> &str {
        self.model.group_name()
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Dao over a bare table name, for tables without a model.
#[derive(Clone, Debug)]
pub struct TableDao {
    table: String,
    group: String,
    columns: Vec<String>,
}

impl TableDao {
    pub fn new(table: impl Into<String>) -> Self {
        TableDao {
            table: table.into(),
            group: DEFAULT_GROUP.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

impl Dao for TableDao {
    fn table(&self) -> &str {
        &self.table
    }

    fn group(&self) -> &str {
        &self.group
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }
}
