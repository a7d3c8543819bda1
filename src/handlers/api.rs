use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::models::{AnalysisRequest, ErrorBody};
use crate::services::image::decode_image;
use crate::services::FoodAnalyzer;

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const HEALTH_PATH: &str = "/api/health";

/// Headers every transport adds to every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, OPTIONS"),
    ("access-control-allow-headers", "Content-Type, Authorization"),
];

/// Transport-neutral request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// Transport-neutral response; `body: None` means an empty body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Self {
                status,
                body: Some(value),
            },
            Err(e) => GatewayError::Internal(e.into()).into(),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: Some(json!({ "error": message })),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }
}

impl From<GatewayError> for ApiResponse {
    fn from(err: GatewayError) -> Self {
        let body = match &err {
            GatewayError::InvalidRequest(message) => ErrorBody {
                error: message.clone(),
                message: None,
            },
            GatewayError::Internal(e) => ErrorBody {
                error: "Failed to analyze image".to_string(),
                message: Some(format!("{:#}", e)),
            },
        };

        Self {
            status: err.status_code(),
            body: serde_json::to_value(body).ok(),
        }
    }
}

/// Shared request handling behind both transport bindings.
#[derive(Clone)]
pub struct ApiHandler {
    analyzer: Arc<FoodAnalyzer>,
}

impl ApiHandler {
    pub fn new(analyzer: Arc<FoodAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let path = request.path.split('?').next().unwrap_or_default();
        log::info!("📨 {} {}", request.method, path);

        match (request.method.as_str(), path) {
            ("OPTIONS", _) => ApiResponse::no_content(),
            ("POST", ANALYZE_PATH) => self.analyze(&request.body).await,
            ("GET", HEALTH_PATH) => self.health(),
            (_, ANALYZE_PATH) | (_, HEALTH_PATH) => ApiResponse::error(405, "Method not allowed"),
            _ => ApiResponse::error(404, "Not found"),
        }
    }

    pub fn health(&self) -> ApiResponse {
        ApiResponse::json(200, &self.analyzer.health())
    }

    pub async fn analyze(&self, body: &[u8]) -> ApiResponse {
        match self.try_analyze(body).await {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    GatewayError::InvalidRequest(message) => {
                        log::warn!("🚫 Rejected analyze request: {}", message)
                    }
                    GatewayError::Internal(e) => log::error!("❌ Failed to analyze image: {:#}", e),
                }
                err.into()
            }
        }
    }

    async fn try_analyze(&self, body: &[u8]) -> Result<ApiResponse, GatewayError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| GatewayError::invalid("Request body must be valid JSON"))?;
        if !value.is_object() {
            return Err(GatewayError::invalid("Request body must be valid JSON"));
        }

        let request: AnalysisRequest = serde_json::from_value(value)
            .map_err(|_| GatewayError::invalid("Request body must be valid JSON"))?;

        let image = match request.image {
            None | Some(Value::Null) => return Err(GatewayError::invalid("No image data provided")),
            Some(Value::String(image)) if image.trim().is_empty() => {
                return Err(GatewayError::invalid("No image data provided"))
            }
            Some(Value::String(image)) => image,
            Some(_) => return Err(GatewayError::invalid("Image data must be a base64 string")),
        };

        log::debug!("📊 Received image field: {} chars", image.len());

        let decoded = decode_image(&image)?;
        let result = self.analyzer.analyze(decoded).await?;

        Ok(ApiResponse::json(200, &result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::AnalysisResult;
    use crate::services::analyzer::tests::{configured, StubBehavior, StubModel};
    use crate::services::VisionModel;
    use base64::{engine::general_purpose, Engine};

    fn jpeg_base64() -> String {
        general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
    }

    fn demo_handler() -> ApiHandler {
        ApiHandler::new(Arc::new(FoodAnalyzer::new(&Config::default(), None)))
    }

    fn stub_handler(behavior: StubBehavior) -> ApiHandler {
        let stub: Arc<dyn VisionModel> = StubModel::new(behavior);
        ApiHandler::new(Arc::new(FoodAnalyzer::new(&configured(), Some(stub))))
    }

    fn post(body: &str) -> ApiRequest {
        ApiRequest {
            method: "POST".to_string(),
            path: ANALYZE_PATH.to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_analyze_with_stubbed_model() {
        let handler = stub_handler(StubBehavior::Answer(
            "```json\n{\"freshness\":85,\"calories\":320,\"summary\":\"...\"}\n```",
        ));
        let body = json!({ "image": jpeg_base64() }).to_string();

        let response = handler.handle(post(&body)).await;

        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            Some(json!({"freshness": 85, "calories": 320, "summary": "..."}))
        );
    }

    #[tokio::test]
    async fn test_analyze_in_demo_mode() {
        let body = json!({ "image": format!("data:image/jpeg;base64,{}", jpeg_base64()) }).to_string();

        let response = demo_handler().handle(post(&body)).await;

        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            Some(serde_json::to_value(AnalysisResult::fallback()).unwrap())
        );
    }

    #[tokio::test]
    async fn test_bad_input_is_400() {
        let handler = demo_handler();
        let cases = [
            ("{}", "No image data provided"),
            (r#"{"image": null}"#, "No image data provided"),
            (r#"{"image": ""}"#, "No image data provided"),
            (r#"{"image": 42}"#, "Image data must be a base64 string"),
            (r#"{"image": "data:image/jpeg;base64,***"}"#, "Invalid base64 image data"),
            ("not json", "Request body must be valid JSON"),
            ("[1, 2]", "Request body must be valid JSON"),
            ("", "Request body must be valid JSON"),
        ];

        for (body, error) in cases {
            let response = handler.handle(post(body)).await;
            assert_eq!(response.status, 400, "body: {}", body);
            assert_eq!(response.body, Some(json!({ "error": error })), "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_internal_fault_is_500() {
        let handler = stub_handler(StubBehavior::Panic);
        let body = json!({ "image": jpeg_base64() }).to_string();

        let response = handler.handle(post(&body)).await;

        assert_eq!(response.status, 500);
        let body = response.body.unwrap();
        assert_eq!(body["error"], "Failed to analyze image");
        assert!(body["message"].as_str().unwrap().contains("analysis task failed"));
    }

    #[tokio::test]
    async fn test_health_is_always_healthy() {
        for handler in [demo_handler(), stub_handler(StubBehavior::Fail)] {
            let response = handler
                .handle(ApiRequest {
                    method: "GET".to_string(),
                    path: "/api/health?probe=1".to_string(),
                    body: Vec::new(),
                })
                .await;

            assert_eq!(response.status, 200);
            assert_eq!(response.body.as_ref().unwrap()["status"], "healthy");
        }

        let demo = demo_handler().health().body.unwrap();
        assert_eq!(demo["gemini_available"], false);
        assert_eq!(demo["api_key_set"], false);
    }

    #[tokio::test]
    async fn test_routing() {
        let handler = demo_handler();
        let request = |method: &str, path: &str| ApiRequest {
            method: method.to_string(),
            path: path.to_string(),
            body: Vec::new(),
        };

        assert_eq!(handler.handle(request("OPTIONS", ANALYZE_PATH)).await, ApiResponse::no_content());
        assert_eq!(handler.handle(request("GET", ANALYZE_PATH)).await.status, 405);
        assert_eq!(handler.handle(request("GET", "/api/unknown")).await.status, 404);
    }
}
