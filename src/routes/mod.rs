//! Router builders.

pub mod common;
pub mod crud;
pub mod upload;

pub use common::common_routes;
pub use crud::crud_routes;
pub use upload::upload_routes;
