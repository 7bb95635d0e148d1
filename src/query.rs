//! Declarative per-endpoint query configuration for List and Page.

use crate::dao::Dao;
use crate::model::Model;
use crate::request::{value_text, RequestCtx};
use crate::sql::{Condition, Direction, Join, JoinType, SelectQuery};
use serde_json::Value;
use std::sync::Arc;

/// One custom WHERE term produced per request.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Applied verbatim.
    Raw(String),
    /// `where(field, value)`; the field may carry an operator suffix or a `?` placeholder.
    Equals(String, Value),
    /// Like `Equals`, applied only when `enabled`.
    ConditionalEquals(String, Value, bool),
}

impl Predicate {
    pub fn raw(clause: impl Into<String>) -> Self {
        Predicate::Raw(clause.into())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Equals(field.into(), value.into())
    }

    pub fn eq_if(field: impl Into<String>, value: impl Into<Value>, enabled: bool) -> Self {
        Predicate::ConditionalEquals(field.into(), value.into(), enabled)
    }

    /// The WHERE term, or `None` when disabled.
    pub fn condition(&self) -> Option<Condition> {
        match self {
            Predicate::Raw(clause) => Some(Condition::raw(clause.clone())),
            Predicate::Equals(field, value) => Some(Condition::from_field(field, value.clone())),
            Predicate::ConditionalEquals(field, value, enabled) => {
                enabled.then(|| Condition::from_field(field, value.clone()))
            }
        }
    }

    /// Cache-key form: `field-value`, or the raw clause.
    pub fn key_fragment(&self) -> Option<String> {
        match self {
            Predicate::Raw(clause) => Some(clause.clone()),
            Predicate::Equals(field, value) => Some(format!("{}-{}", field, value_text(value))),
            Predicate::ConditionalEquals(field, value, enabled) => {
                enabled.then(|| format!("{}-{}", field, value_text(value)))
            }
        }
    }
}

pub type WhereFn = Arc<dyn Fn(&RequestCtx) -> Vec<Predicate> + Send + Sync>;
pub type ExtendFn = Arc<dyn Fn(&RequestCtx, SelectQuery) -> SelectQuery + Send + Sync>;
pub type ModifyResultFn = Arc<dyn Fn(&RequestCtx, Value) -> Value + Send + Sync>;

/// A joined table: `<kind> JOIN table AS alias ON condition`.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinOp {
    pub table: String,
    pub alias: String,
    pub condition: String,
    pub kind: JoinType,
}

impl JoinOp {
    pub fn new(table: impl Into<String>, alias: impl Into<String>, condition: impl Into<String>, kind: JoinType) -> Self {
        JoinOp {
            table: table.into(),
            alias: alias.into(),
            condition: condition.into(),
            kind,
        }
    }

    pub fn from_dao(dao: &dyn Dao, alias: impl Into<String>, condition: impl Into<String>, kind: JoinType) -> Self {
        JoinOp::new(dao.table(), alias, condition, kind)
    }

    pub fn from_model(model: &dyn Model, alias: impl Into<String>, condition: impl Into<String>, kind: JoinType) -> Self {
        JoinOp::new(model.table_name(), alias, condition, kind)
    }

    pub fn to_join(&self) -> Join {
        Join {
            kind: self.kind,
            table: self.table.clone(),
            alias: (!self.alias.is_empty()).then(|| self.alias.clone()),
            condition: self.condition.clone(),
        }
    }
}

/// Filters, ordering, projection, joins and post-processing for one List or Page endpoint.
/// Read-only once handed to a service.
#[derive(Clone, Default)]
pub struct QueryOp {
    /// Request parameters that become equality filters when non-empty.
    pub field_eq: Vec<String>,
    /// Columns OR-matched with `LIKE %keyWord%`.
    pub keyword_fields: Vec<String>,
    /// Default ordering, used only when the request gives no `order`/`sort`.
    pub add_order_by: Vec<(String, Direction)>,
    pub where_fn: Option<WhereFn>,
    /// Page only.
    pub or_where_fn: Option<WhereFn>,
    pub select: Option<String>,
    pub alias: Option<String>,
    pub joins: Vec<JoinOp>,
    pub extend: Option<ExtendFn>,
    pub modify_result: Option<ModifyResultFn>,
}

impl QueryOp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_eq<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_eq = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn keyword_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyword_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.add_order_by.push((field.into(), direction));
        self
    }

    pub fn where_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestCtx) -> Vec<Predicate> + Send + Sync + 'static,
    {
        self.where_fn = Some(Arc::new(f));
        self
    }

    pub fn or_where_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestCtx) -> Vec<Predicate> + Send + Sync + 'static,
    {
        self.or_where_fn = Some(Arc::new(f));
        self
    }

    pub fn select(mut self, fields: impl Into<String>) -> Self {
        self.select = Some(fields.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn join(mut self, join: JoinOp) -> Self {
        self.joins.push(join);
        self
    }

    pub fn extend<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestCtx, SelectQuery) -> SelectQuery + Send + Sync + 'static,
    {
        self.extend = Some(Arc::new(f));
        self
    }

    pub fn modify_result<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestCtx, Value) -> Value + Send + Sync + 'static,
    {
        self.modify_result = Some(Arc::new(f));
        self
    }

    /// Evaluate the where callback for this request.
    pub fn predicates(&self, req: &RequestCtx) -> Vec<Predicate> {
        self.where_fn.as_ref().map(|f| f(req)).unwrap_or_default()
    }

    pub fn or_predicates(&self, req: &RequestCtx) -> Vec<Predicate> {
        self.or_where_fn.as_ref().map(|f| f(req)).unwrap_or_default()
    }
}

impl std::fmt::Debug for QueryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOp")
            .field("field_eq", &self.field_eq)
            .field("keyword_fields", &self.keyword_fields)
            .field("add_order_by", &self.add_order_by)
            .field("select", &self.select)
            .field("alias", &self.alias)
            .field("joins", &self.joins)
            .field("where_fn", &self.where_fn.is_some())
            .field("or_where_fn", &self.or_where_fn.is_some())
            .field("extend", &self.extend.is_some())
            .field("modify_result", &self.modify_result.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::CmpOp;
    use serde_json::json;

    #[test]
    fn predicates_map_to_conditions() {
        assert_eq!(Predicate::raw("a.status = 1").condition(), Some(Condition::raw("a.status = 1")));
        assert_eq!(
            Predicate::eq("price >", 10).condition(),
            Some(Condition::Cmp("price".into(), CmpOp::Gt, json!(10)))
        );
        assert_eq!(Predicate::eq_if("typeId", "3", false).condition(), None);
        assert_eq!(Predicate::eq_if("typeId", "3", true).condition(), Some(Condition::eq("typeId", "3")));
    }

    #[test]
    fn key_fragments() {
        assert_eq!(Predicate::eq("status", 1).key_fragment().as_deref(), Some("status-1"));
        assert_eq!(Predicate::eq("name", "x y").key_fragment().as_deref(), Some("name-x y"));
        assert_eq!(Predicate::eq_if("a", 1, false).key_fragment(), None);
        assert_eq!(Predicate::raw("1 = 1").key_fragment().as_deref(), Some("1 = 1"));
    }

    #[test]
    fn builder_keeps_order_of_default_sorts() {
        let op = QueryOp::new()
            .order_by("sort", Direction::Asc)
            .order_by("createTime", Direction::Desc)
            .where_fn(|req| vec![Predicate::eq("route", req.route.clone())]);
        assert_eq!(
            op.add_order_by,
            vec![("sort".to_string(), Direction::Asc), ("createTime".to_string(), Direction::Desc)]
        );
        let req = RequestCtx::new("/admin/x/page", json!({}));
        assert_eq!(op.predicates(&req), vec![Predicate::eq("route", "/admin/x/page")]);
        assert!(op.or_predicates(&req).is_empty());
    }

    #[test]
    fn join_op_drops_empty_alias() {
        let j = JoinOp::new("t", "", "a.tid = t.id", JoinType::Inner).to_join();
        assert_eq!(j.alias, None);
        assert_eq!(j.kind, JoinType::Inner);
    }
}
