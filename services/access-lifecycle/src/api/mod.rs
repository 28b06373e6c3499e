//! HTTP 接口

pub mod error;
pub mod extract;
pub mod http;

pub use error::{ApiError, ApiResult};
pub use extract::ApiJson;
pub use http::lifecycle_routes;
