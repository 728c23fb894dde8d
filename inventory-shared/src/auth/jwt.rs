/// Session token issuance and verification
///
/// Sessions are stateless JWTs signed with HS256 (HMAC-SHA256). The server
/// keeps nothing per session: a token stays valid until its `exp` passes, and
/// the role it carries is the role the user had at login time.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Lifetime**: 7 days by default
/// - **Validation**: Signature, expiration (no leeway), not-before and issuer
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use inventory_shared::auth::jwt::{create_token, validate_token, Claims};
/// use inventory_shared::models::{id::DocumentId, user::UserRole};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let id = DocumentId::new();
/// let claims = Claims::new(id.clone(), "a@x.com", UserRole::User);
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated.sub, id);
/// assert_eq!(validated.role, UserRole::User);
/// # Ok(())
/// # }
/// ```
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::{id::DocumentId, user::UserRole};

/// Issuer written into and required from every token
pub const ISSUER: &str = "super-inventory";

/// Default session lifetime in days
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Default session lifetime
pub fn default_session_ttl() -> Duration {
    Duration::days(DEFAULT_SESSION_TTL_DAYS)
}

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature mismatch, malformed token or wrong issuer
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user id)
/// - `iss`: Issuer (always "super-inventory")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
/// - `nbf`: Not before timestamp
///
/// # Custom Claims
///
/// - `email`: Email address at issuance
/// - `role`: Role at issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: DocumentId,

    /// Email address (custom claim)
    pub email: String,

    /// Role (custom claim)
    pub role: UserRole,

    /// Issuer - Always "super-inventory"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims valid for the default session lifetime
    pub fn new(user_id: DocumentId, email: impl Into<String>, role: UserRole) -> Self {
        Self::with_expiration(user_id, email, role, default_session_ttl())
    }

    /// Creates claims with a custom lifetime
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Duration;
    /// use inventory_shared::auth::jwt::Claims;
    /// use inventory_shared::models::{id::DocumentId, user::UserRole};
    ///
    /// let claims = Claims::with_expiration(
    ///     DocumentId::new(),
    ///     "a@x.com",
    ///     UserRole::Admin,
    ///     Duration::hours(1),
    /// );
    /// assert_eq!(claims.exp - claims.iat, 3600);
    /// ```
    pub fn with_expiration(
        user_id: DocumentId,
        email: impl Into<String>,
        role: UserRole,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            email: email.into(),
            role,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
        }
    }
}

/// Signs claims into a token
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and returns its claims
///
/// Verifies the HS256 signature, `exp` (with zero leeway), `nbf` and that the
/// issuer is [`ISSUER`].
///
/// # Errors
///
/// - `JwtError::Expired` once `exp` has passed
/// - `JwtError::InvalidToken` for any other failure
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}
