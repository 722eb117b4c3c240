//! Gemini provider for machine translation
//!
//! This module prompts a Gemini model through the Generative Language API
//! (`models/{model}:generateContent`) to translate text.
//!
//! # Authentication
//!
//! The provider loads the API key from the `GEMINI_API_KEY` environment
//! variable and sends it in the `x-goog-api-key` header. `GEMINI_MODEL`
//! optionally overrides the model. Obtain a key from:
//! https://aistudio.google.com/
//!
//! # Example
//!
//! ```ignore
//! use tolk_mt::{GeminiProvider, MachineTranslator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = GeminiProvider::from_env()?.lite();
//!     let result = provider.translate("Bonjour", "French", "English").await?;
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```

use crate::error::{MtError, MtResult};
use crate::translator::{MachineTranslator, validate_language};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Generative Language API provider
#[derive(Clone)]
pub struct GeminiProvider {
    /// API key for authentication
    api_key: String,
    /// HTTP client for async requests
    client: reqwest::Client,
    /// Base URL of the Generative Language API
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Model used unless configured otherwise
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";

    /// Cheaper, faster model
    pub const LITE_MODEL: &'static str = "gemini-2.0-flash-lite";

    /// Maximum characters per request
    const MAX_CHARS: usize = 30_000;

    /// Create a new GeminiProvider with an explicit API key
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New provider instance using `DEFAULT_MODEL`
    /// * `Err(MtError)` - If API key is empty or HTTP client creation fails
    pub fn new(api_key: String) -> MtResult<Self> {
        if api_key.trim().is_empty() {
            return Err(MtError::ConfigError("API key cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| MtError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
        })
    }

    /// Create a GeminiProvider from `GEMINI_API_KEY` and, if set, `GEMINI_MODEL`
    pub fn from_env() -> MtResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            MtError::ConfigError("GEMINI_API_KEY environment variable not set".to_string())
        })?;

        let provider = Self::new(api_key)?;
        Ok(match std::env::var("GEMINI_MODEL") {
            Ok(model) if !model.trim().is_empty() => provider.with_model(model.trim()),
            _ => provider,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Switch to `LITE_MODEL`
    pub fn lite(self) -> Self {
        self.with_model(Self::LITE_MODEL)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn prompt(text: &str, source_language: &str, target_language: &str) -> String {
        format!(
            "Translate the following text from {source_language} to {target_language}. \
             Reply with the translated text only, without quotes, notes or explanations.\n\n{text}"
        )
    }

    /// Classify a failed response
    ///
    /// Quota exhaustion is reported with HTTP 429, the `RESOURCE_EXHAUSTED`
    /// status, or only in the message text depending on the endpoint.
    fn classify_error(status: u16, body: &str) -> MtError {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let api_status = parsed
            .as_ref()
            .and_then(|v| v["error"]["status"].as_str())
            .unwrap_or_default();
        let message = parsed
            .as_ref()
            .and_then(|v| v["error"]["message"].as_str())
            .unwrap_or(body)
            .to_string();

        if status == 429
            || api_status == "RESOURCE_EXHAUSTED"
            || message.contains("You exceeded your current quota")
        {
            MtError::RateLimited(message)
        } else if status == 400 || status == 401 || status == 403 || status == 404 {
            MtError::ConfigError(format!("API client error ({}): {}", status, message))
        } else {
            MtError::TranslationError(format!("API error ({}): {}", status, message))
        }
    }

    /// Concatenated text parts of the first candidate
    fn extract_text(json: &Value) -> MtResult<String> {
        let Some(candidate) = json["candidates"].as_array().and_then(|c| c.first()) else {
            let reason = json["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            return Err(MtError::TranslationError(format!(
                "Invalid API response: {}",
                reason
            )));
        };

        let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
            MtError::TranslationError(
                "Invalid API response: missing 'content.parts' array".to_string(),
            )
        })?;

        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        Ok(text.trim().to_string())
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl MachineTranslator for GeminiProvider {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> MtResult<String> {
        validate_language(source_language)?;
        validate_language(target_language)?;

        if text.is_empty() {
            return Ok(String::new());
        }

        if text.chars().count() > Self::MAX_CHARS {
            return Err(MtError::TranslationError(format!(
                "Text exceeds maximum length of {} characters",
                Self::MAX_CHARS
            )));
        }

        let body = json!({
            "contents": [{
                "parts": [{ "text": Self::prompt(text, source_language, target_language) }]
            }]
        });

        debug!(model = %self.model, chars = text.chars().count(), "gemini request");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let err = Self::classify_error(status.as_u16(), &error_text);
            warn!(%status, error = %err, "gemini request failed");
            return Err(err);
        }

        let json: Value = response.json().await.map_err(|e| {
            MtError::TranslationError(format!("Failed to parse API response: {}", e))
        })?;

        Self::extract_text(&json)
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Initialization Tests ==========

    #[test]
    fn test_new_with_valid_key() {
        let provider = GeminiProvider::new("test-api-key".to_string()).unwrap();
        assert_eq!(provider.provider_name(), "Gemini");
        assert_eq!(provider.model(), GeminiProvider::DEFAULT_MODEL);
    }

    #[test]
    fn test_new_with_empty_key() {
        match GeminiProvider::new("   ".to_string()) {
            Err(MtError::ConfigError(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected ConfigError"),
        }
    }

    #[test]
    fn test_lite_model_and_endpoint() {
        let provider = GeminiProvider::new("k".to_string()).unwrap().lite();
        assert_eq!(provider.model(), "gemini-2.0-flash-lite");
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_debug_masks_key() {
        let provider = GeminiProvider::new("very-secret".to_string()).unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_prompt_names_both_languages() {
        let prompt = GeminiProvider::prompt("שלום", "Hebrew", "English");
        assert!(prompt.contains("from Hebrew to English"));
        assert!(prompt.ends_with("שלום"));
    }

    // ========== Classification Tests ==========

    #[test]
    fn test_classify_http_429() {
        assert!(GeminiProvider::classify_error(429, "slow down").is_rate_limit());
    }

    #[test]
    fn test_classify_resource_exhausted() {
        let body = r#"{"error": {"code": 400, "message": "Quota hit", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(GeminiProvider::classify_error(400, body).is_rate_limit());
    }

    #[test]
    fn test_classify_quota_message() {
        let body = r#"{"error": {"code": 500, "message": "You exceeded your current quota, please check your plan"}}"#;
        assert!(GeminiProvider::classify_error(500, body).is_rate_limit());
    }

    #[test]
    fn test_classify_generic_failures() {
        let body = r#"{"error": {"code": 500, "message": "Internal error", "status": "INTERNAL"}}"#;
        assert!(matches!(
            GeminiProvider::classify_error(500, body),
            MtError::TranslationError(_)
        ));
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            GeminiProvider::classify_error(400, body),
            MtError::ConfigError(_)
        ));
    }

    // ========== Response Tests ==========

    #[test]
    fn test_extract_text_joins_parts() {
        let json = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world\n" }], "role": "model" }
            }]
        });
        assert_eq!(GeminiProvider::extract_text(&json).unwrap(), "Hello world");
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let json = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        match GeminiProvider::extract_text(&json) {
            Err(MtError::TranslationError(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("Expected TranslationError, got {:?}", other),
        }
    }

    // ========== Validation Tests ==========

    #[tokio::test]
    async fn test_translate_empty_text() {
        let provider = GeminiProvider::new("test-key".to_string()).unwrap();
        assert_eq!(provider.translate("", "Hebrew", "English").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_translate_invalid_language() {
        let provider = GeminiProvider::new("test-key".to_string()).unwrap();
        assert!(matches!(
            provider.translate("hello", "", "English").await,
            Err(MtError::InvalidLanguage(_))
        ));
    }

    #[tokio::test]
    async fn test_translate_text_too_long() {
        let provider = GeminiProvider::new("test-key".to_string()).unwrap();
        let long_text = "x".repeat(GeminiProvider::MAX_CHARS + 1);
        match provider.translate(&long_text, "English", "French").await {
            Err(MtError::TranslationError(msg)) => assert!(msg.contains("maximum length")),
            _ => panic!("Expected TranslationError"),
        }
    }

    // ========== Real API Tests ==========

    #[tokio::test]
    #[ignore] // Run with: cargo test --ignored
    async fn test_real_api_translation() {
        let Ok(provider) = GeminiProvider::from_env() else {
            eprintln!("Skipping: GEMINI_API_KEY not set");
            return;
        };
        let result = provider.translate("Bonjour", "French", "English").await.unwrap();
        assert!(result.to_lowercase().contains("hello") || result.to_lowercase().contains("good"));
    }
}
