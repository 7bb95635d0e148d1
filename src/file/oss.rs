use super::{date_dir, FileDriver, UploadFile, MODE_OSS};
use crate::config::{FileConfig, OssConfig};
use crate::error::AppError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use serde_json::{json, Value};

/// S3-compatible object storage; objects land at `uploads/<YYYYMMDD>/<name>`.
#[derive(Clone, Debug)]
pub struct OssDriver {
    client: Client,
    bucket: String,
    endpoint: String,
}

fn endpoint_host(endpoint: &str) -> &str {
    endpoint
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
}

fn endpoint_url(cfg: &OssConfig) -> String {
    let scheme = if cfg.use_ssl { "https" } else { "http" };
    format!("{}://{}", scheme, endpoint_host(&cfg.endpoint))
}

/// Object key for an upload; an explicit client key keeps only its last path segment.
pub fn object_key(file: &UploadFile, dir: &str) -> String {
    let name = file
        .key
        .as_deref()
        .and_then(|k| k.rsplit('/').next())
        .filter(|k| !k.is_empty() && *k != "." && *k != "..")
        .map(str::to_string)
        .unwrap_or_else(|| file.generated_name());
    format!("uploads/{}/{}", dir, name)
}

impl OssDriver {
    pub async fn connect(cfg: &FileConfig) -> Self {
        let oss = &cfg.oss;
        let credentials = Credentials::new(
            oss.access_key_id.clone(),
            oss.secret_access_key.clone(),
            None,
            None,
            "admin-scaffold",
        );
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(oss.location.clone()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint_url(oss))
            .load()
            .await;
        let s3 = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();
        OssDriver {
            client: Client::from_conf(s3),
            bucket: oss.bucket_name.clone(),
            endpoint: endpoint_host(&oss.endpoint).to_string(),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}.{}/{}", self.bucket, self.endpoint, key)
    }
}

#[async_trait]
impl FileDriver for OssDriver {
    fn mode(&self) -> Value {
        json!({ "mode": MODE_OSS, "type": MODE_OSS })
    }

    async fn upload(&self, file: UploadFile) -> Result<String, AppError> {
        let key = object_key(&file, &date_dir());
        let mut put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.to_vec()));
        if let Some(ct) = &file.content_type {
            put = put.content_type(ct);
        }
        put.send()
            .await
            .map_err(|e| AppError::Storage(format!("put {}: {}", key, e)))?;
        tracing::debug!(bucket = %self.bucket, key = %key, "object stored");
        Ok(self.public_url(&key))
    }
}
