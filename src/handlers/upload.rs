//! Multipart upload through the configured file driver.

use crate::error::AppError;
use crate::file::{UploadFile, MODE_NONE};
use crate::response::ok;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
};
use serde_json::json;

pub const EMPTY_UPLOAD: &str = "上传文件为空";

/// `POST /upload`: form field `file`, optional `key` (object name for oss). Returns the public URL.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<impl IntoResponse, AppError> {
    let driver = state.files.active()?.clone();
    let mut file: Option<UploadFile> = None;
    let mut key: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| AppError::Upload(e.to_string()))?;
                file = Some(UploadFile {
                    file_name,
                    content_type,
                    bytes,
                    key: None,
                });
            }
            Some("key") => {
                key = Some(field.text().await.map_err(|e| AppError::Upload(e.to_string()))?);
            }
            _ => {}
        }
    }
    let mut file = file
        .filter(|f| !f.bytes.is_empty())
        .ok_or_else(|| AppError::Upload(EMPTY_UPLOAD.into()))?;
    file.key = key.filter(|k| !k.trim().is_empty());
    let url = driver.upload(file).await?;
    tracing::info!(url = %url, "file uploaded");
    Ok(ok(&state.config.core.success_message, url))
}

/// `GET /upload/mode`.
pub async fn upload_mode(State(state): State<AppState>) -> impl IntoResponse {
    let mode = match state.files.active() {
        Ok(driver) => driver.mode(),
        Err(_) => json!({ "mode": MODE_NONE, "type": MODE_NONE }),
    };
    ok(&state.config.core.success_message, mode)
}
