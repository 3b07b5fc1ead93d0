use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use safepost_infer::DetectionEngine;
use safepost_types::DetectionResult;

use crate::{EvalError, Outcome};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can turn image bytes into an [`Outcome`].
#[async_trait]
pub trait AnalyzeClient: Send + Sync {
    async fn analyze(&self, file_name: &str, bytes: Vec<u8>, mime_type: &str) -> Outcome;
}

/// Posts images to a running server's `/api/analyze`.
pub struct HttpAnalyzeClient {
    client: reqwest::Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl HttpAnalyzeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EvalError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_cookie: None,
        })
    }

    /// Logs in through `/api/auth/login` and keeps the session cookie for
    /// later calls.
    pub async fn login(mut self, username: &str, password: &str) -> Result<Self, EvalError> {
        let resp = self
            .client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EvalError::Login(resp.status().as_u16()));
        }
        self.session_cookie = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(|pair| pair.trim().to_string())
            .next();
        Ok(self)
    }
}

#[async_trait]
impl AnalyzeClient for HttpAnalyzeClient {
    async fn analyze(&self, file_name: &str, bytes: Vec<u8>, mime_type: &str) -> Outcome {
        let part = match Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
        {
            Ok(part) => part,
            Err(e) => return Outcome::Failed(e.to_string()),
        };
        let mut req = self
            .client
            .post(format!("{}/api/analyze", self.base_url))
            .multipart(Form::new().part("image", part));
        if let Some(cookie) = &self.session_cookie {
            req = req.header(COOKIE, cookie);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Outcome::Failed(e.to_string()),
        };
        let status = resp.status();
        if !status.is_success() {
            return Outcome::Failed(format!("HTTP status {}", status.as_u16()));
        }
        match resp.json::<DetectionResult>().await {
            Ok(result) => Outcome::Detected(result),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

/// Calls a [`DetectionEngine`] in-process, bypassing the HTTP server.
pub struct EngineAnalyzeClient<E> {
    engine: E,
}

impl<E: DetectionEngine> EngineAnalyzeClient<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<E: DetectionEngine> AnalyzeClient for EngineAnalyzeClient<E> {
    async fn analyze(&self, _file_name: &str, bytes: Vec<u8>, mime_type: &str) -> Outcome {
        match self.engine.detect(&bytes, mime_type).await {
            Ok(result) => Outcome::Detected(result),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}
