use super::{date_dir, FileDriver, UploadFile, MODE_LOCAL};
use crate::config::FileConfig;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

/// URL path local uploads are served under.
pub const PUBLIC_UPLOADS: &str = "/public/uploads";

/// Saves to `<upload_dir>/<YYYYMMDD>/<uuid>.<ext>`.
#[derive(Clone, Debug)]
pub struct LocalDriver {
    root: PathBuf,
    domain: String,
}

impl LocalDriver {
    pub async fn new(cfg: &FileConfig) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&cfg.upload_dir)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {}", cfg.upload_dir.display(), e)))?;
        Ok(LocalDriver {
            root: cfg.upload_dir.clone(),
            domain: cfg.domain.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl FileDriver for LocalDriver {
    fn mode(&self) -> Value {
        json!({ "mode": MODE_LOCAL, "type": MODE_LOCAL })
    }

    async fn upload(&self, file: UploadFile) -> Result<String, AppError> {
        let dir = date_dir();
        let name = file.generated_name();
        let target_dir = self.root.join(&dir);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {}", target_dir.display(), e)))?;
        let target = target_dir.join(&name);
        tokio::fs::write(&target, &file.bytes)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {}", target.display(), e)))?;
        tracing::debug!(path = %target.display(), bytes = file.bytes.len(), "file stored");
        Ok(format!("{}{}/{}/{}", self.domain, PUBLIC_UPLOADS, dir, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[tokio::test]
    async fn stores_under_date_dir_and_returns_public_url() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = FileConfig {
            mode: MODE_LOCAL.into(),
            domain: "http://files.test/".into(),
            upload_dir: tmp.path().join("uploads"),
            ..FileConfig::default()
        };
        let driver = LocalDriver::new(&cfg).await.unwrap();
        let url = driver
            .upload(UploadFile {
                file_name: Some("a.txt".into()),
                bytes: Bytes::from_static(b"hello"),
                ..Default::default()
            })
            .await
            .unwrap();
        let prefix = format!("http://files.test/public/uploads/{}/", date_dir());
        assert!(url.starts_with(&prefix), "{url}");
        let name = url.trim_start_matches(&prefix);
        assert!(name.ends_with(".txt"));
        let saved = std::fs::read(cfg.upload_dir.join(date_dir()).join(name)).unwrap();
        assert_eq!(saved, b"hello");
    }
}
