//! Per-request input: the route and the merged request parameters.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Empty means absent, null, `""`, `[]` or `{}`. `0` and `false` are values.
pub fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Text form of a scalar (strings unquoted).
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Request parameters: query string merged with a JSON object body; body keys win.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new(map: Map<String, Value>) -> Self {
        Params(map)
    }

    pub fn from_parts(query: HashMap<String, String>, body: Option<Map<String, Value>>) -> Self {
        let mut map: Map<String, Value> = query.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
        if let Some(body) = body {
            map.extend(body);
        }
        Params(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The value when present and not empty.
    pub fn non_empty(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !is_empty_value(v))
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.non_empty(key).is_none()
    }

    pub fn str(&self, key: &str) -> Option<String> {
        self.non_empty(key).map(value_text)
    }

    /// Integer from a number or numeric string.
    pub fn i64(&self, key: &str) -> Option<i64> {
        match self.non_empty(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> bool {
        match self.non_empty(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"),
            _ => false,
        }
    }

    /// `ids` as a list: a JSON array, a comma-separated string, or a single scalar.
    pub fn ids(&self) -> Vec<Value> {
        match self.non_empty("ids") {
            Some(Value::Array(items)) => items.iter().filter(|v| !is_empty_value(v)).cloned().collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Value> for Params {
    /// Non-object values yield empty params.
    fn from(v: Value) -> Self {
        match v {
            Value::Object(map) => Params(map),
            _ => Params::default(),
        }
    }
}

/// What a service call sees of the HTTP request.
#[derive(Clone, Debug, Default)]
pub struct RequestCtx {
    /// Request path, e.g. `/admin/demo/goods/page`; scopes cache keys.
    pub route: String,
    pub params: Params,
}

impl RequestCtx {
    pub fn new(route: impl Into<String>, params: impl Into<Params>) -> Self {
        RequestCtx {
            route: route.into(),
            params: params.into(),
        }
    }
}
