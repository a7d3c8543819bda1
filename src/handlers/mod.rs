pub mod api;

pub use api::{ApiHandler, ApiRequest, ApiResponse, ANALYZE_PATH, CORS_HEADERS, HEALTH_PATH};
