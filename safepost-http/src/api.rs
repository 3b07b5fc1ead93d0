use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use safepost_auth::AuthError;
use safepost_classifier::{check_consistency, Consistency, Verdict};
use safepost_types::{DetectionResult, Report};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::session::session_cookie;
use crate::AppState;

const IMAGE_FIELD: &str = "image";

/// Upload intake: takes the `image` part as-is and hands it to the engine.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let Ok(mut multipart) = multipart else {
        return no_image();
    };

    let (bytes, mime_type) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(IMAGE_FIELD) => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => break (bytes, mime_type),
                    Err(e) => {
                        tracing::error!(%request_id, error = %e, "failed to read upload");
                        return fallback();
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => return no_image(),
            Err(e) => {
                tracing::warn!(%request_id, error = %e, "malformed multipart body");
                return no_image();
            }
        }
    };

    tracing::info!(
        %request_id,
        bytes = bytes.len(),
        mime_type = %mime_type,
        sha256 = %hex::encode(Sha256::digest(&bytes)),
        "analyzing image"
    );

    match state.engine.detect(&bytes, &mime_type).await {
        Ok(result) => {
            if let Consistency::Mismatch {
                reported_safe,
                flagged,
            } = check_consistency(&result)
            {
                tracing::warn!(
                    %request_id,
                    reported_safe,
                    flagged = ?flagged,
                    "model verdict contradicts its category flags"
                );
            }
            tracing::info!(%request_id, verdict = ?Verdict::of(&result), "analysis complete");
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            tracing::error!(
                %request_id,
                verdict = ?Verdict::Unknown,
                kind = e.kind(),
                error = %e,
                "analysis failed"
            );
            fallback()
        }
    }
}

fn no_image() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "No image provided" })),
    )
        .into_response()
}

fn fallback() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(DetectionResult::fallback()),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub message: String,
}

/// Any well-formed JSON body is accepted; only unparseable bodies and sink
/// failures answer 500.
pub async fn report(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<ReportResponse>) {
    let submitted = serde_json::from_slice::<serde_json::Value>(&body)
        .map_err(|e| e.to_string())
        .map(|value| Report::from_value(&value))
        .and_then(|report| state.reports.submit(&report).map_err(|e| e.to_string()));
    match submitted {
        Ok(()) => (
            StatusCode::OK,
            Json(ReportResponse {
                success: true,
                message: "Report submitted successfully".into(),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "report submission failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReportResponse {
                    success: false,
                    message: "Failed to submit report".into(),
                }),
            )
        }
    }
}

pub async fn auth_check(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let authenticated = state.gate.check(session_cookie(&headers));
    Json(json!({ "authenticated": authenticated }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    match state
        .gate
        .login(req.username.as_deref(), req.password.as_deref())
    {
        Ok(token) => {
            tracing::info!("login succeeded");
            (
                StatusCode::OK,
                [(SET_COOKIE, state.gate.set_cookie(&token))],
                Json(json!({ "success": true })),
            )
                .into_response()
        }
        Err(e) => {
            let status = match e {
                AuthError::MissingFields => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Key => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(SET_COOKIE, state.gate.logout_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response()
}

pub async fn healthz() -> &'static str {
    "ok"
}
