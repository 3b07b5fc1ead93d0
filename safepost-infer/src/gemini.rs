use std::time::Instant;

use async_trait::async_trait;
use safepost_types::DetectionResult;
use serde::Deserialize;

use crate::normalize::{extract_text, normalize, GenerateContentResponse};
use crate::request::build_request;
use crate::{DetectionEngine, InferError};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Calls Gemini's `generateContent` with a JSON response schema.
pub struct GeminiEngine {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiEngine {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl DetectionEngine for GeminiEngine {
    async fn detect(&self, image: &[u8], mime_type: &str) -> Result<DetectionResult, InferError> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(InferError::MissingCredentials),
        };

        let body = build_request(image, mime_type);
        let start = Instant::now();
        tracing::debug!(
            model = %self.config.model,
            bytes = image.len(),
            mime_type,
            "sending detection request"
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = resp.json().await?;
        let result = normalize(extract_text(&payload)?)?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            safe = result.safe,
            "detection complete"
        );
        Ok(result)
    }
}
