//! Session gate: static-credential login, a signed session cookie, and the
//! path guard applied in front of every protected route.
//!
//! Session state never lives on the server. Callers pass in the cookie value
//! they received and get back either a decision or a `Set-Cookie` header to
//! send.

use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

pub mod guard;
pub use guard::{guard, is_exempt, GuardDecision};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "safepost_session";
pub const SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

const SESSION_MARKER: &str = "authenticated";
const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "password";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingFields,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("session key rejected")]
    Key,
}

/// The single username/password pair accepted by `login`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.into(),
            password: DEFAULT_PASSWORD.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cookie value proving a successful login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn value(&self) -> &str {
        &self.0
    }
}

pub struct SessionGate {
    credentials: Credentials,
    key: Vec<u8>,
    secure_cookie: bool,
}

impl SessionGate {
    pub fn new(credentials: Credentials, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            credentials,
            key: secret.into(),
            secure_cookie: false,
        }
    }

    /// Gate keyed by a fresh random secret. Sessions do not survive a restart.
    pub fn with_random_secret(credentials: Credentials) -> Self {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(credentials, secret)
    }

    pub fn secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    /// Plain equality against the configured pair.
    pub fn login(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<SessionToken, AuthError> {
        let (Some(username), Some(password)) = (username, password) else {
            return Err(AuthError::MissingFields);
        };
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        if username != self.credentials.username || password != self.credentials.password {
            tracing::warn!(username, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        let tag = self.sign(SESSION_MARKER)?;
        Ok(SessionToken(format!("{SESSION_MARKER}.{tag}")))
    }

    /// True iff `cookie_value` carries the marker with a valid tag.
    pub fn check(&self, cookie_value: Option<&str>) -> bool {
        let Some((marker, tag)) = cookie_value.and_then(|v| v.split_once('.')) else {
            return false;
        };
        if marker != SESSION_MARKER {
            return false;
        }
        let Ok(tag) = hex::decode(tag) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else {
            return false;
        };
        mac.update(marker.as_bytes());
        mac.verify_slice(&tag).is_ok()
    }

    pub fn set_cookie(&self, token: &SessionToken) -> String {
        self.cookie_header(token.value(), SESSION_MAX_AGE_SECS)
    }

    pub fn logout_cookie(&self) -> String {
        self.cookie_header("", 0)
    }

    fn cookie_header(&self, value: &str, max_age: u64) -> String {
        let mut header =
            format!("{SESSION_COOKIE}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax");
        if self.secure_cookie {
            header.push_str("; Secure");
        }
        header
    }

    fn sign(&self, marker: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| AuthError::Key)?;
        mac.update(marker.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Value of cookie `name` within a `Cookie` request header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SessionGate {
        SessionGate::new(Credentials::default(), b"test-secret".to_vec())
    }

    #[test]
    fn default_credentials_log_in() {
        let gate = gate();
        let token = gate.login(Some("admin"), Some("password")).unwrap();
        assert!(gate.check(Some(token.value())));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let gate = gate();
        assert_eq!(
            gate.login(Some("admin"), Some("hunter2")),
            Err(AuthError::InvalidCredentials)
        );
        assert!(!gate.check(None));
    }

    #[test]
    fn missing_or_empty_fields() {
        let gate = gate();
        assert_eq!(gate.login(None, Some("password")), Err(AuthError::MissingFields));
        assert_eq!(gate.login(Some(""), Some("password")), Err(AuthError::MissingFields));
        assert_eq!(gate.login(Some("admin"), Some("")), Err(AuthError::MissingFields));
    }

    #[test]
    fn bare_marker_does_not_verify() {
        let gate = gate();
        assert!(!gate.check(Some("authenticated")));
        assert!(!gate.check(Some("authenticated.00ff")));
        assert!(!gate.check(Some("authenticated.not-hex")));
    }

    #[test]
    fn token_from_another_key_does_not_verify() {
        let other = SessionGate::new(Credentials::default(), b"other".to_vec());
        let token = other.login(Some("admin"), Some("password")).unwrap();
        assert!(!gate().check(Some(token.value())));
    }

    #[test]
    fn set_cookie_attributes() {
        let gate = gate().secure_cookie(true);
        let token = gate.login(Some("admin"), Some("password")).unwrap();
        let header = gate.set_cookie(&token);
        assert!(header.starts_with("safepost_session=authenticated."));
        assert!(header.contains("Max-Age=604800"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.ends_with("; Secure"));
        assert!(gate.logout_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn cookie_header_parsing() {
        let header = "theme=dark; safepost_session=authenticated.abcd;other=1";
        assert_eq!(cookie_value(header, SESSION_COOKIE), Some("authenticated.abcd"));
        assert_eq!(cookie_value(header, "other"), Some("1"));
        assert_eq!(cookie_value(header, "missing"), None);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let rendered = format!("{:?}", Credentials::default());
        assert!(!rendered.contains("password\""));
        assert!(rendered.contains("<redacted>"));
    }
}
