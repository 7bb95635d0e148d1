//! Named in-process functions that addons expose as tasks, invoked as `name(param)`.

use crate::error::AppError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Error prefix for calls naming an unregistered function.
pub const FUNC_NOT_FOUND: &str = "函数不存在";

#[async_trait]
pub trait CoreFunc: Send + Sync {
    async fn func(&self, param: &str) -> Result<(), AppError>;

    /// At most one run at a time; overlapping calls are skipped.
    fn is_singleton(&self) -> bool {
        false
    }

    /// Run on every worker rather than on the master only.
    fn is_all_worker(&self) -> bool {
        false
    }
}

/// Split `name(param)` into its name and parameter. A call without parentheses is a bare name.
pub fn parse_call(call: &str) -> (&str, &str) {
    let Some(open) = call.find('(') else {
        return (call.trim(), "");
    };
    let rest = &call[open + 1..];
    let param = match rest.find(')') {
        Some(close) => &rest[..close],
        None => rest,
    };
    (call[..open].trim(), param)
}

/// Releases a singleton's slot when its run ends, including on error.
struct RunSlot<'a> {
    running: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.remove(&self.name);
    }
}

#[derive(Default)]
pub struct FuncRegistry {
    funcs: HashMap<String, Arc<dyn CoreFunc>>,
    running: Mutex<HashSet<String>>,
}

impl FuncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering a name twice replaces the earlier function.
    pub fn register(&mut self, name: impl Into<String>, func: Arc<dyn CoreFunc>) {
        self.funcs.insert(name.into(), func);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CoreFunc>> {
        self.funcs.get(name)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run `name(param)` in this process. Returns `false` when a singleton was already running.
    pub async fn run(&self, call: &str) -> Result<bool, AppError> {
        let (name, param) = parse_call(call);
        let Some(func) = self.funcs.get(name) else {
            let err = AppError::Validation(format!("{}:{}", FUNC_NOT_FOUND, name));
            tracing::error!(func = %name, "{}", err);
            return Err(err);
        };
        let _slot = if func.is_singleton() {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            if !running.insert(name.to_string()) {
                tracing::debug!(func = %name, "singleton already running, skipped");
                return Ok(false);
            }
            Some(RunSlot {
                running: &self.running,
                name: name.to_string(),
            })
        } else {
            None
        };
        tracing::debug!(func = %name, param = %param, "running func");
        func.func(param).await?;
        Ok(true)
    }

    /// Cluster-wide dispatch. A single process is its own master, so this runs locally.
    pub async fn cluster_run(&self, call: &str) -> Result<bool, AppError> {
        self.run(call).await
    }
}

impl fmt::Debug for FuncRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncRegistry").field("funcs", &self.names()).finish()
    }
}
