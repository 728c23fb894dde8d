/// Request authentication
///
/// Turns the credentials on an incoming request into an [`AuthContext`]. The
/// token may arrive as an `Authorization: Bearer` header, as the `token`
/// cookie, or either; which ones are honoured is an operator setting
/// ([`TokenTransport`]).
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use inventory_shared::auth::jwt::{create_token, Claims};
/// use inventory_shared::auth::middleware::{authenticate, TokenTransport};
/// use inventory_shared::models::{id::DocumentId, user::UserRole};
///
/// let claims = Claims::new(DocumentId::new(), "a@x.com", UserRole::User);
/// let token = create_token(&claims, "secret").unwrap();
///
/// let mut headers = HeaderMap::new();
/// headers.insert(
///     header::AUTHORIZATION,
///     HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
/// );
///
/// let auth = authenticate(&headers, "secret", TokenTransport::Both).unwrap();
/// assert_eq!(auth.email, "a@x.com");
/// ```
use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::cookie::{read_cookie, SESSION_COOKIE};
use super::jwt::{validate_token, Claims, JwtError};
use crate::models::{id::DocumentId, user::UserRole};

/// Which request locations may carry the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenTransport {
    /// Only the http-only `token` cookie
    Cookie,

    /// Only the `Authorization: Bearer` header
    Bearer,

    /// Either; the header wins when both are present
    #[default]
    Both,
}

impl TokenTransport {
    pub fn accepts_cookie(&self) -> bool {
        matches!(self, TokenTransport::Cookie | TokenTransport::Both)
    }

    pub fn accepts_bearer(&self) -> bool {
        matches!(self, TokenTransport::Bearer | TokenTransport::Both)
    }
}

impl FromStr for TokenTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cookie" => Ok(TokenTransport::Cookie),
            "bearer" | "header" => Ok(TokenTransport::Bearer),
            "both" => Ok(TokenTransport::Both),
            other => Err(format!("Unknown token transport: {}", other)),
        }
    }
}

/// Identity of the caller, taken from verified token claims
///
/// Added to request extensions by the authentication layer. Handlers extract
/// it with `Extension<AuthContext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: DocumentId,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether the caller is the given user
    pub fn is_user(&self, id: &DocumentId) -> bool {
        &self.user_id == id
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in any accepted location
    #[error("Access Denied / No Token Provided")]
    MissingCredentials,

    /// Token present but unusable
    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            _ => AuthError::InvalidToken("Invalid Token".to_string()),
        }
    }
}

/// Finds the raw session token in the accepted locations
///
/// # Errors
///
/// - `MissingCredentials` when no accepted location carries a token
/// - `InvalidToken` when an `Authorization` header is present but is not a
///   Bearer token and no cookie can stand in for it
pub fn extract_token(headers: &HeaderMap, transport: TokenTransport) -> Result<String, AuthError> {
    let mut malformed_header = false;

    if transport.accepts_bearer() {
        if let Some(value) = headers.get(header::AUTHORIZATION) {
            match value.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) {
                Some(token) if !token.trim().is_empty() => return Ok(token.trim().to_string()),
                _ => malformed_header = true,
            }
        }
    }

    if transport.accepts_cookie() {
        if let Some(token) = read_cookie(headers, SESSION_COOKIE).filter(|t| !t.is_empty()) {
            return Ok(token);
        }
    }

    if malformed_header {
        Err(AuthError::InvalidToken("Expected Bearer token".to_string()))
    } else {
        Err(AuthError::MissingCredentials)
    }
}

/// Extracts and verifies the session token
///
/// # Errors
///
/// Any [`AuthError`] from [`extract_token`], or `InvalidToken` when the
/// signature, issuer or expiry check fails
pub fn authenticate(
    headers: &HeaderMap,
    secret: &str,
    transport: TokenTransport,
) -> Result<AuthContext, AuthError> {
    let token = extract_token(headers, transport)?;
    let claims = validate_token(&token, secret)?;

    Ok(AuthContext::from_claims(claims))
}
