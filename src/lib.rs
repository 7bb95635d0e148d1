//! Admin scaffold: addon-based CRUD backends over sqlite, mysql or postgres.

pub mod addon;
pub mod app;
pub mod config;
pub mod controller;
pub mod dao;
pub mod db;
pub mod error;
pub mod file;
pub mod func;
pub mod handlers;
pub mod id;
pub mod logging;
pub mod model;
pub mod query;
pub mod request;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use addon::{Addon, AddonContext, AddonRegistry, AddonVersion};
pub use app::{build, build_from_config, serve};
pub use config::{AppConfig, TimeColumns, DEFAULT_GROUP};
pub use controller::{Controller, ControllerSimple};
pub use dao::{Dao, ModelDao, TableDao};
pub use db::{Database, DbConn, Dialect};
pub use error::{AppError, ConfigError};
pub use func::{CoreFunc, FuncRegistry};
pub use id::IdGenerator;
pub use model::{ColumnDef, ColumnKind, Model, ModelRegistry};
pub use query::{JoinOp, Predicate, QueryOp};
pub use request::{Params, RequestCtx};
pub use response::{BaseRes, FAIL_CODE, OK_CODE};
pub use routes::{common_routes, crud_routes};
pub use service::{Api, CrudService, DbCache, NoHooks, ServiceContext, ServiceHooks};
pub use sql::{Direction, JoinType, SelectQuery};
pub use state::{AppContext, AppState};
