/// Session cookie helpers
///
/// The session token travels in an `HttpOnly` cookie named `token`. Its
/// `SameSite`/`Secure` attributes depend on how the frontend is deployed:
///
/// - [`CookieProfile::SameOrigin`]: `SameSite=Strict`, no `Secure` (local development)
/// - [`CookieProfile::CrossOrigin`]: `SameSite=None; Secure` (frontend on another origin)
use axum::http::{header, HeaderMap};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Cookie attribute profile selected by the deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieProfile {
    SameOrigin,
    CrossOrigin,
}

impl CookieProfile {
    fn attributes(&self) -> &'static str {
        match self {
            CookieProfile::SameOrigin => "HttpOnly; SameSite=Strict; Path=/",
            CookieProfile::CrossOrigin => "HttpOnly; Secure; SameSite=None; Path=/",
        }
    }
}

/// `Set-Cookie` value carrying a session token
///
/// # Example
///
/// ```
/// use inventory_shared::auth::cookie::{session_cookie, CookieProfile};
///
/// let cookie = session_cookie("abc.def.ghi", 60, CookieProfile::SameOrigin);
/// assert_eq!(cookie, "token=abc.def.ghi; Max-Age=60; HttpOnly; SameSite=Strict; Path=/");
/// ```
pub fn session_cookie(token: &str, max_age_seconds: i64, profile: CookieProfile) -> String {
    format!(
        "{}={}; Max-Age={}; {}",
        SESSION_COOKIE,
        token,
        max_age_seconds,
        profile.attributes()
    )
}

/// `Set-Cookie` value that removes the session cookie
///
/// Attributes must match the ones used when the cookie was set, otherwise
/// browsers keep the original.
pub fn clear_session_cookie(profile: CookieProfile) -> String {
    format!(
        "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
        SESSION_COOKIE,
        profile.attributes()
    )
}

/// Reads a cookie value from the request headers
///
/// Browsers may send several `Cookie` headers; all of them are searched.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
