//! Everything handlers need, built once at startup and shared read-only.

use crate::addon::AddonVersion;
use crate::config::AppConfig;
use crate::db::Database;
use crate::file::FileRegistry;
use crate::func::FuncRegistry;
use crate::model::{EpsInfo, ModelRegistry};
use crate::service::ServiceContext;
use std::sync::Arc;

pub struct AppContext {
    pub config: AppConfig,
    pub db: Database,
    pub services: ServiceContext,
    pub models: ModelRegistry,
    pub files: FileRegistry,
    pub addons: Vec<AddonVersion>,
    /// Functions registered by addons, run as `name(param)`.
    pub funcs: FuncRegistry,
    /// Column metadata per controller prefix, served at `/eps` when enabled.
    pub eps: EpsInfo,
}

pub type AppState = Arc<AppContext>;
