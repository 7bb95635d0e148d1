//! Connection groups over `sqlx::Any`: dialect selection, driver links, and a borrowed executor.

mod row;

pub use row::row_to_json;

use crate::config::{DatabaseConfig, DriverType, DEFAULT_GROUP};
use crate::error::{AppError, ConfigError};
use crate::sql::{bind_all, QueryBuf};
use serde_json::Value;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyConnection, AnyPool};
use sqlx::Row;
use std::collections::{BTreeMap, HashMap};

/// SQL flavour of a connection group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
    Postgres,
}

impl Dialect {
    /// Quote an identifier; dotted names (`a.name`) are quoted per segment and `*` is left bare.
    pub fn quote_ident(&self, ident: &str) -> String {
        ident
            .split('.')
            .map(|part| {
                let part = part.trim();
                if part == "*" {
                    return part.to_string();
                }
                match self {
                    Dialect::MySql => format!("`{}`", part.replace('`', "``")),
                    Dialect::Sqlite | Dialect::Postgres => format!("\"{}\"", part.replace('"', "\"\"")),
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Placeholder for the `n`th (1-based) parameter.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }
}

impl From<DriverType> for Dialect {
    fn from(driver: DriverType) -> Self {
        match driver {
            DriverType::Sqlite => Dialect::Sqlite,
            DriverType::Mysql => Dialect::MySql,
            DriverType::Postgres => Dialect::Postgres,
        }
    }
}

/// Driver named by a link's scheme.
pub fn driver_from_link(link: &str) -> Option<DriverType> {
    let scheme = link.split(':').next()?.to_ascii_lowercase();
    match scheme.as_str() {
        "sqlite" => Some(DriverType::Sqlite),
        "mysql" | "mariadb" => Some(DriverType::Mysql),
        "postgres" | "postgresql" => Some(DriverType::Postgres),
        _ => None,
    }
}

/// Connection link for a group: the explicit `link`, else one assembled from the discrete fields.
pub fn build_link(cfg: &DatabaseConfig) -> String {
    if !cfg.link.trim().is_empty() {
        return cfg.link.trim().to_string();
    }
    let with_extra = |base: String, sep: char| {
        if cfg.extra.is_empty() {
            base
        } else {
            format!("{}{}{}", base, sep, cfg.extra.trim_start_matches(['?', '&']))
        }
    };
    match cfg.driver {
        DriverType::Sqlite => {
            if cfg.name == ":memory:" {
                "sqlite::memory:".to_string()
            } else {
                with_extra(format!("sqlite://{}?mode=rwc", cfg.name), '&')
            }
        }
        DriverType::Mysql => {
            let port = if cfg.port.is_empty() { "3306" } else { &cfg.port };
            with_extra(
                format!(
                    "mysql://{}:{}@{}:{}/{}?charset={}",
                    cfg.user, cfg.pass, cfg.host, port, cfg.name, cfg.charset
                ),
                '&',
            )
        }
        DriverType::Postgres => {
            let port = if cfg.port.is_empty() { "5432" } else { &cfg.port };
            with_extra(
                format!("postgres://{}:{}@{}:{}/{}", cfg.user, cfg.pass, cfg.host, port, cfg.name),
                '?',
            )
        }
    }
}

#[derive(Clone, Debug)]
pub struct DbGroup {
    pub pool: AnyPool,
    pub dialect: Dialect,
    /// Log statements at info level.
    pub debug: bool,
}

/// Named connection groups, built once at startup and shared by every service.
#[derive(Clone, Debug, Default)]
pub struct Database {
    groups: HashMap<String, DbGroup>,
}

impl Database {
    /// Open one pool per configured group.
    pub async fn connect(groups: &BTreeMap<String, DatabaseConfig>) -> Result<Self, AppError> {
        sqlx::any::install_default_drivers();
        let mut db = Database::default();
        for (name, cfg) in groups {
            let link = build_link(cfg);
            let driver = driver_from_link(&link).ok_or_else(|| ConfigError::UnknownDriver(link.clone()))?;
            let pool = AnyPoolOptions::new()
                .max_connections(cfg.max_connections)
                .connect(&link)
                .await?;
            tracing::info!(group = %name, driver = ?driver, "database group connected");
            db.groups.insert(
                name.clone(),
                DbGroup {
                    pool,
                    dialect: driver.into(),
                    debug: cfg.debug,
                },
            );
        }
        Ok(db)
    }

    /// Registry around an existing pool (tests, embedding).
    pub fn from_pool(group: &str, pool: AnyPool, dialect: Dialect) -> Self {
        Database::default().with_group(group, pool, dialect)
    }

    pub fn with_group(mut self, group: &str, pool: AnyPool, dialect: Dialect) -> Self {
        self.groups.insert(
            group.to_string(),
            DbGroup {
                pool,
                dialect,
                debug: false,
            },
        );
        self
    }

    pub fn group(&self, name: &str) -> Result<&DbGroup, AppError> {
        let name = if name.is_empty() { DEFAULT_GROUP } else { name };
        self.groups
            .get(name)
            .ok_or_else(|| AppError::Config(ConfigError::UnknownGroup(name.to_string())))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

/// A borrowed connection (pooled or inside a transaction) plus the dialect used to render SQL for it.
pub struct DbConn<'c> {
    conn: &'c mut AnyConnection,
    dialect: Dialect,
    debug: bool,
}

impl<'c> DbConn<'c> {
    pub fn new(conn: &'c mut AnyConnection, group: &DbGroup) -> Self {
        DbConn {
            conn,
            dialect: group.dialect,
            debug: group.debug,
        }
    }

    pub fn with_dialect(conn: &'c mut AnyConnection, dialect: Dialect) -> Self {
        DbConn {
            conn,
            dialect,
            debug: false,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn log(&self, q: &QueryBuf) {
        if self.debug {
            tracing::info!(sql = %q.sql, params = ?q.params, "query");
        } else {
            tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        }
    }

    pub async fn fetch_all(&mut self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        self.log(q);
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    pub async fn fetch_optional(&mut self, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        self.log(q);
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    /// First column of the first row as a count (COUNT queries).
    pub async fn fetch_count(&mut self, q: &QueryBuf) -> Result<u64, AppError> {
        self.log(q);
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_one(&mut *self.conn)
            .await?;
        let n: i64 = row.try_get(0)?;
        Ok(n.max(0) as u64)
    }

    /// Run a statement; returns rows affected.
    pub async fn execute(&mut self, q: &QueryBuf) -> Result<u64, AppError> {
        self.log(q);
        let result = bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Run trusted DDL without parameters.
    pub async fn execute_ddl(&mut self, sql: &str) -> Result<(), AppError> {
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(sql).execute(&mut *self.conn).await?;
        Ok(())
    }
}
