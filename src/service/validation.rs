//! Request checks that need no database: required keys and the update id.

use crate::error::AppError;
use crate::request::Params;
use serde_json::Value;

pub const ID_REQUIRED: &str = "id不能为空";

pub struct RequestValidator;

impl RequestValidator {
    /// Every key must be present and non-null; the first missing key fails with its message.
    pub fn not_null(params: &Params, rules: &[(String, String)]) -> Result<(), AppError> {
        for (key, message) in rules {
            if params.get(key).map_or(true, Value::is_null) {
                return Err(AppError::Validation(message.clone()));
            }
        }
        Ok(())
    }

    /// The `id` a single-row operation targets.
    pub fn require_id(params: &Params) -> Result<Value, AppError> {
        params
            .non_empty("id")
            .cloned()
            .ok_or_else(|| AppError::Validation(ID_REQUIRED.into()))
    }
}
