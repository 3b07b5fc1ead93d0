#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    RedirectToLogin,
    RedirectHome,
    /// 401 for API callers.
    Unauthorized,
}

const LOGIN_PATH: &str = "/login";
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp"];

/// Paths the gate never inspects: auth endpoints, static assets, images and
/// the health probe.
pub fn is_exempt(path: &str) -> bool {
    if path == "/api/auth" || path.starts_with("/api/auth/") {
        return true;
    }
    if path.starts_with("/static/") || path == "/favicon.ico" || path == "/healthz" {
        return true;
    }
    path.rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

pub fn guard(path: &str, authenticated: bool) -> GuardDecision {
    if is_exempt(path) {
        return GuardDecision::Pass;
    }
    if path == LOGIN_PATH {
        return if authenticated {
            GuardDecision::RedirectHome
        } else {
            GuardDecision::Pass
        };
    }
    if authenticated {
        return GuardDecision::Pass;
    }
    if path == "/api" || path.starts_with("/api/") {
        GuardDecision::Unauthorized
    } else {
        GuardDecision::RedirectToLogin
    }
}
