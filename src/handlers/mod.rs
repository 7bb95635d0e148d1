//! HTTP handlers for CRUD controllers and file upload.

pub mod crud;
pub mod upload;
