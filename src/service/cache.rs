//! In-process cache of paged query results, keyed by route and request parameters.

use crate::config::CacheConfig;
use moka::future::Cache;
use serde_json::Value;
use std::time::Duration;

/// Paged-result cache. A disabled cache never stores or returns entries.
#[derive(Clone)]
pub struct DbCache {
    inner: Option<Cache<String, Value>>,
}

impl DbCache {
    pub fn new(cfg: &CacheConfig) -> Self {
        if !cfg.enable {
            return Self::disabled();
        }
        let inner = Cache::builder()
            .max_capacity(cfg.max_capacity)
            .time_to_live(Duration::from_millis(cfg.expire_ms))
            .build();
        DbCache { inner: Some(inner) }
    }

    pub fn disabled() -> Self {
        DbCache { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let cache = self.inner.as_ref()?;
        cache.get(key).await
    }

    pub async fn insert(&self, key: String, value: Value) {
        if let Some(cache) = &self.inner {
            cache.insert(key, value).await;
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match &self.inner {
            Some(cache) => cache.iter().map(|(k, _)| k.as_ref().clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Drop every cached page; pages may join any table. Returns how many entries were removed.
    pub async fn invalidate_all(&self) -> usize {
        let Some(cache) = &self.inner else {
            return 0;
        };
        let stale = self.keys();
        for key in &stale {
            cache.invalidate(key).await;
        }
        if !stale.is_empty() {
            tracing::debug!(removed = stale.len(), "db cache invalidated");
        }
        stale.len()
    }
}

impl std::fmt::Debug for DbCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbCache").field("enabled", &self.is_enabled()).finish()
    }
}

/// Components of a paged-query cache key. Every component is always present so
/// positions never shift between requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageCacheKey {
    pub route: String,
    pub page: u64,
    pub size: u64,
    /// `field-value` per applied equality filter.
    pub field_eq: Vec<String>,
    pub wheres: Vec<String>,
    pub or_wheres: Vec<String>,
    pub keyword: String,
    /// Default ordering as `field-direction` pairs, when it was applied.
    pub default_order: String,
    /// Request ordering as `field-direction`.
    pub request_order: String,
}

/// Percent-encodes the key's own separators so user text cannot shift segment boundaries.
fn escape(text: &str) -> String {
    text.replace('%', "%25")
        .replace('&', "%26")
        .replace('/', "%2F")
        .replace('#', "%23")
        .replace(' ', "&&")
}

fn join_fragments(parts: &[String]) -> String {
    parts.iter().map(|p| escape(p)).collect::<Vec<_>>().join("#")
}

impl PageCacheKey {
    pub fn to_key(&self) -> String {
        [
            self.route.clone(),
            self.page.to_string(),
            self.size.to_string(),
            join_fragments(&self.field_eq),
            join_fragments(&self.wheres),
            join_fragments(&self.or_wheres),
            escape(&self.keyword),
            escape(&self.default_order),
            escape(&self.request_order),
        ]
        .join("/")
    }
}
