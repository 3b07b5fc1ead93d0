//! SafePost HTTP surface: upload intake, the session gate and the two
//! static pages.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::Html,
    routing::{get, post},
    Router,
};
use safepost_auth::SessionGate;
use safepost_infer::{DetectionEngine, GeminiEngine, StubDetectionEngine};
use safepost_reports::{LogReportSink, ReportSink};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod session;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, LogFormat};

const INDEX_HTML: &str = include_str!("../assets/index.html");
const LOGIN_HTML: &str = include_str!("../assets/login.html");

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn DetectionEngine>,
    pub gate: Arc<SessionGate>,
    pub reports: Arc<dyn ReportSink>,
    pub upload_limit: Option<usize>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        let engine: Arc<dyn DetectionEngine> = if config.stub_model {
            tracing::warn!("stub detection engine enabled; every image is reported safe");
            Arc::new(StubDetectionEngine)
        } else {
            if !config.gemini.has_api_key() {
                tracing::warn!("GEMINI_API_KEY is not set; every analysis will fail");
            }
            Arc::new(GeminiEngine::new(config.gemini.clone()))
        };

        let gate = match config.session_secret.as_deref() {
            Some(secret) => SessionGate::new(config.auth.clone(), secret.as_bytes()),
            None => SessionGate::with_random_secret(config.auth.clone()),
        }
        .secure_cookie(config.secure_cookie);

        Self {
            engine,
            gate: Arc::new(gate),
            reports: Arc::new(LogReportSink),
            upload_limit: config.max_upload_bytes,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = match state.upload_limit {
        Some(bytes) => DefaultBodyLimit::max(bytes),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(index_page))
        .route("/login", get(login_page))
        .route("/healthz", get(api::healthz))
        .route("/api/analyze", post(api::analyze).layer(body_limit))
        .route("/api/report", post(api::report))
        .route("/api/auth/check", get(api::auth_check))
        .route("/api/auth/login", post(api::login))
        .route("/api/auth/logout", post(api::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: AppConfig) -> std::io::Result<()> {
    let state = AppState::from_config(&config);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        model = %config.gemini.model,
        "SafePost listening"
    );
    axum::serve(listener, app(state)).await
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn login_page() -> Html<&'static str> {
    Html(LOGIN_HTML)
}
