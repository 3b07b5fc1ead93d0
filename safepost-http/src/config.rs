use std::fs;
use std::path::Path;

use safepost_auth::Credentials;
use safepost_infer::GeminiConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {key}: {value}")]
    Value { key: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server settings. Built from defaults, then an optional YAML file named by
/// `SAFEPOST_CONFIG`, then environment variables.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    pub gemini: GeminiConfig,
    pub auth: Credentials,
    /// HMAC key for session cookies. Random per process when unset.
    pub session_secret: Option<String>,
    pub secure_cookie: bool,
    /// Serve the offline stub engine instead of Gemini.
    pub stub_model: bool,
    /// Request body cap for uploads. Unlimited when unset.
    pub max_upload_bytes: Option<usize>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
            gemini: GeminiConfig::default(),
            auth: Credentials::default(),
            session_secret: None,
            secure_cookie: false,
            stub_model: false,
            max_upload_bytes: None,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("SAFEPOST_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_path(path)?,
            _ => Self::default(),
        };
        base.overlay(|key| std::env::var(key).ok())
    }

    /// Applies every recognized variable that `lookup` returns non-empty.
    pub fn overlay(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("SAFEPOST_BIND") {
            self.bind = v;
        }
        if let Some(v) = get("GEMINI_API_KEY") {
            self.gemini.api_key = Some(v);
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.gemini.model = v;
        }
        if let Some(v) = get("GEMINI_BASE_URL") {
            self.gemini.base_url = v;
        }
        if let Some(v) = get("AUTH_USERNAME") {
            self.auth.username = v;
        }
        if let Some(v) = get("AUTH_PASSWORD") {
            self.auth.password = v;
        }
        if let Some(v) = get("SAFEPOST_SESSION_SECRET") {
            self.session_secret = Some(v);
        }
        if let Some(v) = get("SAFEPOST_SECURE_COOKIE") {
            self.secure_cookie = parse_flag("SAFEPOST_SECURE_COOKIE", &v)?;
        }
        if let Some(v) = get("SAFEPOST_STUB_MODEL") {
            self.stub_model = parse_flag("SAFEPOST_STUB_MODEL", &v)?;
        }
        if let Some(v) = get("SAFEPOST_MAX_UPLOAD_BYTES") {
            let bytes = v.parse::<usize>().map_err(|_| ConfigError::Value {
                key: "SAFEPOST_MAX_UPLOAD_BYTES",
                value: v.clone(),
            })?;
            self.max_upload_bytes = Some(bytes);
        }
        if let Some(v) = get("SAFEPOST_LOG_FORMAT") {
            self.log_format = match v.to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::Value {
                        key: "SAFEPOST_LOG_FORMAT",
                        value: v,
                    })
                }
            };
        }
        Ok(self)
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Value {
            key,
            value: value.to_string(),
        }),
    }
}
