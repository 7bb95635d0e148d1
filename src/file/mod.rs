//! Upload drivers selected by `core.file.mode`.

mod local;
mod oss;

pub use local::{LocalDriver, PUBLIC_UPLOADS};
pub use oss::OssDriver;

use crate::config::FileConfig;
use crate::error::{AppError, ConfigError};
use async_trait::async_trait;
use axum::body::Bytes;
use serde_json::Value;
use std::sync::Arc;

pub const MODE_NONE: &str = "none";
pub const MODE_LOCAL: &str = "local";
pub const MODE_OSS: &str = "oss";
pub const KNOWN_MODES: [&str; 3] = [MODE_NONE, MODE_LOCAL, MODE_OSS];

/// One uploaded file as received from the multipart form.
#[derive(Clone, Debug, Default)]
pub struct UploadFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    /// Explicit object name requested by the client (oss only).
    pub key: Option<String>,
}

impl UploadFile {
    /// Lowercased alphanumeric extension of the original file name.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        (!ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric())).then_some(ext)
    }

    /// `<uuid>[.ext]`.
    pub fn generated_name(&self) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        match self.extension() {
            Some(ext) => format!("{}.{}", id, ext),
            None => id,
        }
    }
}

/// Date directory uploads are grouped under.
pub fn date_dir() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}

#[async_trait]
pub trait FileDriver: Send + Sync {
    /// `{mode, type}` as reported by `GET /upload/mode`.
    fn mode(&self) -> Value;

    /// Store the file; returns its public URL.
    async fn upload(&self, file: UploadFile) -> Result<String, AppError>;
}

/// The configured upload driver, if any.
#[derive(Clone, Default)]
pub struct FileRegistry {
    driver: Option<Arc<dyn FileDriver>>,
}

impl FileRegistry {
    pub async fn from_config(cfg: &FileConfig) -> Result<Self, AppError> {
        let driver: Option<Arc<dyn FileDriver>> = match cfg.mode.as_str() {
            MODE_NONE | "" => None,
            MODE_LOCAL => Some(Arc::new(LocalDriver::new(cfg).await?)),
            MODE_OSS => Some(Arc::new(OssDriver::connect(cfg).await)),
            other => return Err(ConfigError::UnknownFileMode(other.to_string()).into()),
        };
        if let Some(d) = &driver {
            tracing::info!(mode = %d.mode(), "file driver ready");
        }
        Ok(FileRegistry { driver })
    }

    pub fn with_driver(driver: Arc<dyn FileDriver>) -> Self {
        FileRegistry { driver: Some(driver) }
    }

    pub fn active(&self) -> Result<&Arc<dyn FileDriver>, AppError> {
        self.driver
            .as_ref()
            .ok_or_else(|| AppError::Upload("file upload is disabled".into()))
    }
}
