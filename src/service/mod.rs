//! Generic CRUD service driven by query descriptors, plus the shared pieces every service uses.

pub mod cache;
mod crud;
mod validation;

pub use cache::{DbCache, PageCacheKey};
pub use crud::{BeforeFn, CrudService, InsertParamFn, LIST_LIMIT};
pub use validation::{RequestValidator, ID_REQUIRED};

use crate::config::{AppConfig, TimeColumns};
use crate::db::DbConn;
use crate::error::AppError;
use crate::id::IdGenerator;
use crate::request::Params;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Operations a controller can expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Api {
    Add,
    Delete,
    Update,
    Info,
    List,
    Page,
}

impl Api {
    pub const ALL: [Api; 6] = [Api::Add, Api::Delete, Api::Update, Api::Info, Api::List, Api::Page];
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Shared collaborators handed to every service at construction.
#[derive(Clone, Debug)]
pub struct ServiceContext {
    pub ids: Arc<IdGenerator>,
    pub cache: DbCache,
    pub time: TimeColumns,
}

impl ServiceContext {
    pub fn new(ids: Arc<IdGenerator>, cache: DbCache, time: TimeColumns) -> Self {
        ServiceContext { ids, cache, time }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        ServiceContext {
            ids: Arc::new(IdGenerator::new(config.core.node_id)),
            cache: DbCache::new(&config.cache),
            time: TimeColumns::from(&config.core),
        }
    }
}

/// Side effects around Add/Delete/Update, run inside the mutation's transaction.
/// An error from either hook rolls the whole mutation back.
#[async_trait]
pub trait ServiceHooks: Send + Sync {
    async fn modify_before(&self, _conn: &mut DbConn<'_>, _api: Api, _params: &Params) -> Result<(), AppError> {
        Ok(())
    }

    /// For Add, `params` carries the generated `id`.
    async fn modify_after(&self, _conn: &mut DbConn<'_>, _api: Api, _params: &Params) -> Result<(), AppError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl ServiceHooks for NoHooks {}
