use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

use super::ai_service::analysis_prompt;
use super::sanitize::parse_analysis;
use super::{GeminiService, VisionModel};
use crate::config::Config;
use crate::error::GatewayError;
use crate::models::{AnalysisResult, EncodedImage, HealthStatus};

/// The Image Analysis Gateway: one image in, one well-formed result out.
///
/// Upstream trouble (no credential, network/auth/quota errors, timeouts,
/// unparseable answers) never reaches the caller; it degrades to
/// [`AnalysisResult::fallback`]. Only a fault inside the analysis task itself
/// is reported as [`GatewayError::Internal`].
pub struct FoodAnalyzer {
    model: Option<Arc<dyn VisionModel>>,
    prompt: String,
    timeout: Duration,
    api_key_set: bool,
}

impl FoodAnalyzer {
    /// The model is ignored unless the config has a usable credential and
    /// the integration enabled.
    pub fn new(config: &Config, model: Option<Arc<dyn VisionModel>>) -> Self {
        Self {
            model: model.filter(|_| config.gemini_available()),
            prompt: analysis_prompt(&config.language),
            timeout: config.analyze_timeout,
            api_key_set: config.api_key_set(),
        }
    }

    /// Builds the Gemini client when the integration is configured, demo mode otherwise.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let model: Option<Arc<dyn VisionModel>> = match (&config.gemini_api_key, config.gemini_enabled) {
            (Some(api_key), true) => Some(Arc::new(GeminiService::new(
                api_key.clone(),
                config.gemini_model.clone(),
                config.gemini_api_base.clone(),
                config.analyze_timeout,
            )?)),
            _ => None,
        };

        Ok(Self::new(config, model))
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn api_key_set(&self) -> bool {
        self.api_key_set
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::healthy(self.is_available(), self.api_key_set)
    }

    pub async fn analyze(&self, image: EncodedImage) -> Result<AnalysisResult, GatewayError> {
        let model = match &self.model {
            Some(model) => model.clone(),
            None => {
                log::info!("🧪 Demo mode (Gemini not configured), returning fallback result");
                return Ok(AnalysisResult::fallback());
            }
        };

        log::debug!(
            "🔍 Analyzing {} bytes ({}) with {}",
            image.bytes.len(),
            image.mime_type,
            model.name()
        );

        // The call runs on its own task: a dropped caller does not cancel it,
        // and a panic inside the client is reported instead of unwinding here.
        let prompt = self.prompt.clone();
        let task = tokio::spawn(async move { model.generate(&prompt, &image).await });

        let answer = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                log::warn!(
                    "⏱️ Gemini did not answer within {:?}, returning fallback result",
                    self.timeout
                );
                return Ok(AnalysisResult::fallback());
            }
            Ok(Err(join_error)) => {
                log::error!("❌ Analysis task failed: {}", join_error);
                return Err(GatewayError::Internal(anyhow!(
                    "analysis task failed: {}",
                    join_error
                )));
            }
            Ok(Ok(Err(e))) => {
                log::warn!("⚠️ Gemini call failed, returning fallback result: {:#}", e);
                return Ok(AnalysisResult::fallback());
            }
            Ok(Ok(Ok(text))) => text,
        };

        match parse_analysis(&answer) {
            Some(result) => {
                log::info!(
                    "✅ Analysis: freshness={} calories={}",
                    result.freshness,
                    result.calories
                );
                Ok(result)
            }
            None => {
                log::warn!("⚠️ Could not parse Gemini answer, returning fallback result. Raw: {}", answer);
                Ok(AnalysisResult::fallback())
            }
        }
    }
}
