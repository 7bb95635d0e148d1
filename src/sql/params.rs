//! Convert serde_json::Value to types that the sqlx Any driver can bind.

use serde_json::Value;
use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;

pub type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// A value that can be bound through `sqlx::Any`. Arrays and objects travel as JSON text.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    BindValue::F64(f)
                } else {
                    BindValue::String(n.to_string())
                }
            }
            Value::String(s) => BindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::String(v.to_string()),
        }
    }

    pub fn bind<'q>(self, query: AnyQuery<'q>) -> AnyQuery<'q> {
        match self {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(b),
            BindValue::I64(n) => query.bind(n),
            BindValue::F64(n) => query.bind(n),
            BindValue::String(s) => query.bind(s),
        }
    }
}

/// Bind every parameter in order.
pub fn bind_all<'q>(mut query: AnyQuery<'q>, params: &[Value]) -> AnyQuery<'q> {
    for p in params {
        query = BindValue::from_json(p).bind(query);
    }
    query
}
