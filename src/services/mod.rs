pub mod ai_service; // Vision model seam + prompt
pub mod analyzer;
pub mod gemini; // Google Gemini client
pub mod image;
pub mod sanitize;

pub use ai_service::VisionModel;
pub use analyzer::FoodAnalyzer;
pub use gemini::GeminiService;
