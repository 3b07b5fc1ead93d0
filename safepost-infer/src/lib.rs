use async_trait::async_trait;
use safepost_types::DetectionResult;
use thiserror::Error;

pub mod gemini;
pub mod normalize;
pub mod request;

pub use gemini::{GeminiConfig, GeminiEngine};
pub use normalize::normalize;
pub use request::build_request;

#[derive(Debug, Error)]
pub enum InferError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingCredentials,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no content")]
    EmptyResponse,
    #[error("malformed model output: {0}")]
    Malformed(String),
}

impl InferError {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InferError::MissingCredentials => "missing_credentials",
            InferError::Http(_) => "http",
            InferError::Status { .. } => "status",
            InferError::EmptyResponse => "empty_response",
            InferError::Malformed(_) => "malformed",
        }
    }
}

/// One image in, one verdict out. Implementations make at most one call to
/// the model and never retry.
#[async_trait]
pub trait DetectionEngine: Send + Sync {
    async fn detect(&self, image: &[u8], mime_type: &str) -> Result<DetectionResult, InferError>;
}

/// Offline engine that reports every image as safe. For local UI work only.
pub struct StubDetectionEngine;

#[async_trait]
impl DetectionEngine for StubDetectionEngine {
    async fn detect(&self, _image: &[u8], _mime_type: &str) -> Result<DetectionResult, InferError> {
        Ok(DetectionResult {
            safe: true,
            message: "Stub model: no analysis performed".into(),
            reasoning: "The stub detection engine reports every image as safe.".into(),
            ..Default::default()
        })
    }
}
