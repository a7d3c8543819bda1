use serde::{Deserialize, Serialize};

pub const DEFAULT_FRESHNESS: i64 = 75;
pub const DEFAULT_CALORIES: i64 = 300;
pub const DEFAULT_SUMMARY: &str = "Makanan terdeteksi. Estimasi kalori dan nilai gizi berdasarkan visual makanan. Untuk hasil lebih akurat, pastikan gambar makanan jelas dan pencahayaan baik.";

pub const HEALTH_MESSAGE: &str = "FoodScan AI Backend is running";

/// Body of `POST /api/analyze`. `image` stays untyped so that a missing key,
/// a `null` and a non-string value can be told apart.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub image: Option<serde_json::Value>,
}

/// Nutrition estimate returned to the caller. Always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub freshness: i64,  // 0-100 expected, not enforced
    pub calories: i64,   // kcal
    pub summary: String,
}

impl AnalysisResult {
    /// Canned answer used in demo mode and whenever the model output is unusable.
    pub fn fallback() -> Self {
        Self {
            freshness: DEFAULT_FRESHNESS,
            calories: DEFAULT_CALORIES,
            summary: DEFAULT_SUMMARY.to_string(),
        }
    }
}

/// Decoded image payload plus the MIME type declared to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    pub gemini_available: bool,
    pub api_key_set: bool,
}

impl HealthStatus {
    pub fn healthy(gemini_available: bool, api_key_set: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            message: HEALTH_MESSAGE.to_string(),
            gemini_available,
            api_key_set,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
