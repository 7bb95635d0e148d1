//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE for any supported dialect.
//! Identifiers come from model/descriptor config; request values always travel as parameters.

use crate::db::Dialect;
use crate::error::{AppError, ConfigError};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value, dialect: Dialect) -> String {
        self.params.push(v);
        dialect.placeholder(self.params.len())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl CmpOp {
    fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Like => "LIKE",
        }
    }
}

/// One WHERE term. Terms at the top level of a query are AND-ed.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Cmp(String, CmpOp, Value),
    In(String, Vec<Value>),
    IsNull(String),
    /// SQL text with `?` markers bound in order to the values.
    Clause(String, Vec<Value>),
    /// OR group; an empty group is dropped.
    AnyOf(Vec<Condition>),
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Cmp(field.into(), CmpOp::Eq, value.into())
    }

    pub fn raw(clause: impl Into<String>) -> Self {
        Condition::Clause(clause.into(), Vec::new())
    }

    /// ORM-style `where(field, value)`: a field holding `?` is a clause, a trailing
    /// operator (`age >=`, `name like`) picks the comparison, arrays become IN, else equality.
    pub fn from_field(field: &str, value: Value) -> Self {
        let f = field.trim();
        if f.contains('?') {
            return Condition::Clause(f.to_string(), vec![value]);
        }
        let lower = f.to_ascii_lowercase();
        if let Some(col) = lower.strip_suffix(" like") {
            let col = &f[..col.len()];
            return Condition::Cmp(col.trim().to_string(), CmpOp::Like, value);
        }
        for (suffix, op) in [
            (">=", CmpOp::Ge),
            ("<=", CmpOp::Le),
            ("!=", CmpOp::Ne),
            ("<>", CmpOp::Ne),
            (">", CmpOp::Gt),
            ("<", CmpOp::Lt),
            ("=", CmpOp::Eq),
        ] {
            if let Some(col) = f.strip_suffix(suffix) {
                return Condition::Cmp(col.trim().to_string(), op, value);
            }
        }
        match value {
            Value::Array(values) => Condition::In(f.to_string(), values),
            Value::Null => Condition::IsNull(f.to_string()),
            v => Condition::Cmp(f.to_string(), CmpOp::Eq, v),
        }
    }

    fn render(&self, dialect: Dialect, q: &mut QueryBuf) -> Option<String> {
        Some(match self {
            Condition::Cmp(field, op, value) => {
                let ph = q.push_param(value.clone(), dialect);
                format!("{} {} {}", dialect.quote_ident(field), op.as_sql(), ph)
            }
            Condition::In(field, values) => {
                if values.is_empty() {
                    return Some("1 = 0".into());
                }
                let phs: Vec<String> = values
                    .iter()
                    .map(|v| q.push_param(v.clone(), dialect))
                    .collect();
                format!("{} IN ({})", dialect.quote_ident(field), phs.join(", "))
            }
            Condition::IsNull(field) => format!("{} IS NULL", dialect.quote_ident(field)),
            Condition::Clause(sql, values) => {
                let mut values = values.iter();
                let mut out = String::with_capacity(sql.len() + 8);
                for ch in sql.chars() {
                    match (ch, values.len() > 0) {
                        ('?', true) => {
                            let v = values.next().cloned().unwrap_or(Value::Null);
                            out.push_str(&q.push_param(v, dialect));
                        }
                        _ => out.push(ch),
                    }
                }
                format!("({})", out)
            }
            Condition::AnyOf(conds) => {
                let parts: Vec<String> = conds.iter().filter_map(|c| c.render(dialect, q)).collect();
                if parts.is_empty() {
                    return None;
                }
                format!("({})", parts.join(" OR "))
            }
        })
    }
}

fn render_where(conditions: &[Condition], dialect: Dialect, q: &mut QueryBuf) -> String {
    let parts: Vec<String> = conditions.iter().filter_map(|c| c.render(dialect, q)).collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        })
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(AppError::BadRequest(format!("invalid sort direction '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Order {
    Column(String, Direction),
    Raw(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinType {
    Left,
    Right,
    Inner,
}

impl JoinType {
    fn as_sql(self) -> &'static str {
        match self {
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Inner => "INNER JOIN",
        }
    }
}

impl FromStr for JoinType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "").as_str() {
            "left" | "leftjoin" => Ok(JoinType::Left),
            "right" | "rightjoin" => Ok(JoinType::Right),
            "inner" | "innerjoin" => Ok(JoinType::Inner),
            _ => Err(ConfigError::UnknownJoinType(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub kind: JoinType,
    pub table: String,
    pub alias: Option<String>,
    /// Trusted SQL, e.g. `a.userId = b.id`.
    pub condition: String,
}

/// In-progress SELECT over one table; the shape handed to `extend` callbacks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectQuery {
    table: String,
    alias: Option<String>,
    fields: Option<String>,
    joins: Vec<Join>,
    conditions: Vec<Condition>,
    orders: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    pub fn table(table: impl Into<String>) -> Self {
        SelectQuery {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Raw projection such as `a.id, a.name, b.name AS bname`.
    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn where_field(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Condition::from_field(field, value.into()))
    }

    pub fn where_raw(self, clause: impl Into<String>) -> Self {
        self.filter(Condition::raw(clause))
    }

    pub fn where_in(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filter(Condition::In(field.into(), values))
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(Order::Column(field.into(), direction));
        self
    }

    pub fn order_raw(mut self, order: impl Into<String>) -> Self {
        self.orders.push(Order::Raw(order.into()));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    fn from_clause(&self, dialect: Dialect) -> String {
        let mut out = dialect.quote_ident(&self.table);
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            out.push_str(&dialect.quote_ident(alias));
        }
        for j in &self.joins {
            out.push(' ');
            out.push_str(j.kind.as_sql());
            out.push(' ');
            out.push_str(&dialect.quote_ident(&j.table));
            if let Some(alias) = &j.alias {
                out.push_str(" AS ");
                out.push_str(&dialect.quote_ident(alias));
            }
            out.push_str(" ON ");
            out.push_str(&j.condition);
        }
        out
    }

    /// `SELECT fields FROM table [AS a] [joins] [WHERE] [ORDER BY] [LIMIT] [OFFSET]`.
    pub fn to_select(&self, dialect: Dialect) -> QueryBuf {
        let mut q = QueryBuf::new();
        let fields = self.fields.as_deref().unwrap_or("*");
        let from = self.from_clause(dialect);
        let where_clause = render_where(&self.conditions, dialect, &mut q);
        let order_clause = if self.orders.is_empty() {
            String::new()
        } else {
            let parts: Vec<String> = self
                .orders
                .iter()
                .map(|o| match o {
                    Order::Column(f, d) => format!("{} {}", dialect.quote_ident(f), d.to_string().to_uppercase()),
                    Order::Raw(s) => s.clone(),
                })
                .collect();
            format!(" ORDER BY {}", parts.join(", "))
        };
        let limit_clause = self.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
        let offset_clause = match (self.limit, self.offset) {
            (Some(_), Some(n)) if n > 0 => format!(" OFFSET {}", n),
            _ => String::new(),
        };
        q.sql = format!(
            "SELECT {} FROM {}{}{}{}{}",
            fields, from, where_clause, order_clause, limit_clause, offset_clause
        );
        q
    }

    /// `SELECT COUNT(1)` over the same FROM/WHERE, ignoring order and paging.
    pub fn to_count(&self, dialect: Dialect) -> QueryBuf {
        let mut q = QueryBuf::new();
        let from = self.from_clause(dialect);
        let where_clause = render_where(&self.conditions, dialect, &mut q);
        q.sql = format!("SELECT COUNT(1) AS total FROM {}{}", from, where_clause);
        q
    }
}

/// INSERT one row; columns bound in the given order.
pub fn insert(dialect: Dialect, table: &str, row: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());
    for (name, value) in row {
        cols.push(dialect.quote_ident(name));
        placeholders.push(q.push_param(value.clone(), dialect));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_ident(table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE: SET the given columns where all conditions hold.
pub fn update(dialect: Dialect, table: &str, sets: &[(String, Value)], conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let set_parts: Vec<String> = sets
        .iter()
        .map(|(name, value)| {
            let ph = q.push_param(value.clone(), dialect);
            format!("{} = {}", dialect.quote_ident(name), ph)
        })
        .collect();
    let where_clause = render_where(conditions, dialect, &mut q);
    q.sql = format!(
        "UPDATE {} SET {}{}",
        dialect.quote_ident(table),
        set_parts.join(", "),
        where_clause
    );
    q
}

pub fn delete(dialect: Dialect, table: &str, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = render_where(conditions, dialect, &mut q);
    q.sql = format!("DELETE FROM {}{}", dialect.quote_ident(table), where_clause);
    q
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("identifier pattern")
    })
}

/// Check a request-supplied `order`/`sort` pair before it reaches ORDER BY.
pub fn parse_request_order(order: &str, sort: &str) -> Result<(String, Direction), AppError> {
    let order = order.trim();
    if !identifier_re().is_match(order) {
        return Err(AppError::BadRequest(format!("invalid order field '{}'", order)));
    }
    Ok((order.to_string(), sort.parse()?))
}
