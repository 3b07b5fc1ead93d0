use axum::{
    extract::{Request, State},
    http::{header::COOKIE, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use safepost_auth::{cookie_value, guard, GuardDecision, SESSION_COOKIE};
use serde_json::json;

use crate::AppState;

/// Session cookie value carried by the request, if any.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| cookie_value(h, SESSION_COOKIE))
}

/// Applies the path guard to every request before routing.
pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let authenticated = state.gate.check(session_cookie(req.headers()));
    match guard(req.uri().path(), authenticated) {
        GuardDecision::Pass => next.run(req).await,
        GuardDecision::RedirectToLogin => Redirect::temporary("/login").into_response(),
        GuardDecision::RedirectHome => Redirect::temporary("/").into_response(),
        GuardDecision::Unauthorized => {
            tracing::debug!(path = req.uri().path(), "unauthenticated API request");
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
        }
    }
}
