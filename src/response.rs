//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

pub const OK_CODE: i32 = 1000;
pub const FAIL_CODE: i32 = 1001;

/// Uniform `{code, message, data}` wrapper.
#[derive(Debug, Serialize)]
pub struct BaseRes<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<BaseRes<T>>) {
    (
        StatusCode::OK,
        Json(BaseRes {
            code: OK_CODE,
            message: message.to_string(),
            data: Some(data),
        }),
    )
}

pub fn fail(message: impl Into<String>) -> BaseRes<()> {
    BaseRes {
        code: FAIL_CODE,
        message: message.into(),
        data: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub size: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_envelope_omits_data() {
        let v = serde_json::to_value(fail("boom")).unwrap();
        assert_eq!(v, serde_json::json!({"code": 1001, "message": "boom"}));
    }

    #[test]
    fn ok_envelope_carries_data() {
        let (status, Json(body)) = ok("success", serde_json::json!({"id": "1"}));
        assert_eq!(status, StatusCode::OK);
        let v = serde_json::to_value(body).unwrap();
        assert_eq!(v["code"], 1000);
        assert_eq!(v["data"]["id"], "1");
    }
}
