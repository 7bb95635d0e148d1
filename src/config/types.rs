//! Raw config types matching the TOML layout. Every key has a default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the connection group used when a model does not pick one.
pub const DEFAULT_GROUP: &str = "default";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Connection groups keyed by name; `default` is required.
    pub database: BTreeMap<String, DatabaseConfig>,
    pub cache: CacheConfig,
    pub core: CoreConfig,
    pub logger: LoggerConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    /// Request body cap in bytes (uploads included).
    pub client_max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8200".into(),
            client_max_body_size: 10 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverType {
    Sqlite,
    Mysql,
    #[serde(alias = "pgsql", alias = "postgresql")]
    Postgres,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection link; when set, the discrete fields below are ignored.
    pub link: String,
    #[serde(rename = "type")]
    pub driver: DriverType,
    /// Database name, or the file name for sqlite (`:memory:` for an in-memory db).
    pub name: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub pass: String,
    /// mysql only.
    pub charset: String,
    /// Extra link query parameters, appended verbatim.
    pub extra: String,
    pub max_connections: u32,
    /// Log every statement at info instead of debug.
    pub debug: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            link: String::new(),
            driver: DriverType::Sqlite,
            name: "admin.sqlite".into(),
            host: "127.0.0.1".into(),
            port: String::new(),
            user: String::new(),
            pass: String::new(),
            charset: "utf8mb4".into(),
            extra: String::new(),
            max_connections: 5,
            debug: false,
        }
    }
}

/// DB result cache used by paged queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enable: bool,
    pub expire_ms: u64,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: false,
            expire_ms: 60_000,
            max_capacity: 10_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub app_name: String,
    /// Create missing tables for registered models at startup.
    pub auto_migrate: bool,
    /// Serve column metadata of every controller at `/eps`.
    pub eps: bool,
    /// Snowflake node id, 0..=1023.
    pub node_id: u16,
    pub success_message: String,
    pub create_time_field: String,
    pub update_time_field: String,
    /// Soft-delete column; empty disables soft delete.
    pub delete_time_field: String,
    pub file: FileConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "admin-scaffold".into(),
            auto_migrate: false,
            eps: false,
            node_id: 1,
            success_message: "success".into(),
            create_time_field: "createTime".into(),
            update_time_field: "updateTime".into(),
            delete_time_field: String::new(),
            file: FileConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// `none`, `local` or `oss`.
    pub mode: String,
    /// Public base URL prepended to local upload paths.
    pub domain: String,
    pub upload_dir: PathBuf,
    pub oss: OssConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            mode: "none".into(),
            domain: "http://127.0.0.1:8200".into(),
            upload_dir: PathBuf::from("./public/uploads"),
            oss: OssConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OssConfig {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub use_ssl: bool,
    pub bucket_name: String,
    pub location: String,
}

impl Default for OssConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:9000".into(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            use_ssl: false,
            bucket_name: "admin-scaffold".into(),
            location: "us-east-1".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
    pub stdout: bool,
    /// Directory for daily-rolled log files; empty disables file output.
    pub path: String,
    pub file: String,
    /// Log each request under these prefixes with its elapsed time.
    pub run_log: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            stdout: true,
            path: String::new(),
            file: "admin".into(),
            run_log: true,
        }
    }
}

/// Column names the ORM layer manages on every table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeColumns {
    pub created: String,
    pub updated: String,
    pub deleted: Option<String>,
}

impl Default for TimeColumns {
    fn default() -> Self {
        Self::from(&CoreConfig::default())
    }
}

impl From<&CoreConfig> for TimeColumns {
    fn from(core: &CoreConfig) -> Self {
        let deleted = core.delete_time_field.trim();
        Self {
            created: core.create_time_field.clone(),
            updated: core.update_time_field.clone(),
            deleted: (!deleted.is_empty()).then(|| deleted.to_string()),
        }
    }
}
