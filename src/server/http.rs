use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::handlers::{ApiHandler, ApiResponse, ANALYZE_PATH, CORS_HEADERS, HEALTH_PATH};

pub struct AppState {
    pub handler: ApiHandler,
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self.body {
            Some(body) => (status, Json(body)).into_response(),
            None => status.into_response(),
        }
    }
}

pub fn create_router(handler: ApiHandler, max_body_bytes: usize) -> Router {
    let state = Arc::new(AppState { handler });

    let mut router = Router::new()
        .route(
            ANALYZE_PATH,
            post(analyze_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .route(
            HEALTH_PATH,
            get(health_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state);

    for (name, value) in CORS_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    router
}

async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResponse {
    match body {
        Ok(body) => state.handler.analyze(&body).await,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            log::warn!("🚫 Rejected request: body too large");
            ApiResponse::error(413, "Request body too large")
        }
        Err(rejection) => {
            log::warn!("🚫 Could not read request body: {}", rejection.body_text());
            ApiResponse::error(400, "Request body must be valid JSON")
        }
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> ApiResponse {
    state.handler.health()
}

async fn preflight_handler() -> ApiResponse {
    ApiResponse::no_content()
}

async fn method_not_allowed() -> ApiResponse {
    ApiResponse::error(405, "Method not allowed")
}

async fn not_found() -> ApiResponse {
    ApiResponse::error(404, "Not found")
}
