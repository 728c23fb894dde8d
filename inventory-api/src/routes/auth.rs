/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/users/register` - Create an account with role `user`
/// - `POST /api/users/login` - Verify credentials and start a session
/// - `POST /api/users/logout` - Clear the session cookie
///
/// Sessions are stateless JWTs. Depending on `TOKEN_TRANSPORT` the token is
/// delivered as an http-only `token` cookie, in the response body, or both.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    routes::ApiResponse,
};
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use inventory_shared::{
    auth::{
        cookie::{clear_session_cookie, session_cookie},
        jwt::{create_token, Claims},
    },
    models::{
        id::DocumentId,
        user::{normalize_email, NewUser, User, UserRole},
    },
    repository::RepositoryError,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        required(message = "Email and Password Required"),
        email(message = "Invalid email format")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Email and Password Required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,

    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(required(message = "Email and Password required"))]
    pub email: Option<String>,

    #[validate(required(message = "Email and Password required"))]
    pub password: Option<String>,
}

/// Identity returned at login
#[derive(Debug, Serialize)]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub email: String,
    pub role: UserRole,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,

    /// Present when bearer transport is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    pub user: SessionUser,
}

/// Register a new user
///
/// ```text
/// POST /api/users/register
/// Content-Type: application/json
///
/// { "email": "user@example.com", "password": "secret1", "fullName": "Jane Doe" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing email/password, bad email, short password
/// - `409 Conflict`: Email already registered (case-insensitive)
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<User>>)> {
    let email = normalize_email(&req.email.unwrap_or_default());
    let password = req.password.unwrap_or_default();

    let password_hash = state.credentials.hash_blocking(password).await?;

    let user = state
        .users
        .insert(NewUser {
            email,
            password_hash,
            full_name: req.full_name.unwrap_or_default(),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => ApiError::Conflict("User already exists".to_string()),
            other => other.into(),
        })?;

    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(user).with_message("User Created Successfully")),
    ))
}

/// Login with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password
/// - `401 Unauthorized`: Unknown email or wrong password (same message for both)
/// - `403 Forbidden`: Account is inactive or suspended
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Response> {
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let invalid = || ApiError::Unauthorized("Invalid Credentials".to_string());

    let credentials = state
        .users
        .find_credentials_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    let matches = state
        .credentials
        .verify_blocking(password, credentials.password_hash)
        .await?;

    if !matches {
        return Err(invalid());
    }

    let user = credentials.user;
    if !user.is_active() {
        let status = user.status.map(|s| s.as_str()).unwrap_or("inactive");
        return Err(ApiError::Forbidden(format!("Account is {}", status)));
    }

    let ttl = state.config.jwt.ttl();
    let claims = Claims::with_expiration(user.id.clone(), user.email.clone(), user.role, ttl);
    let token = create_token(&claims, state.jwt_secret())?;

    info!(user_id = %user.id, "User logged in");

    let transport = state.config.jwt.transport;
    let body = LoginResponse {
        success: true,
        message: "Login Successful",
        token: transport.accepts_bearer().then(|| token.clone()),
        user: SessionUser {
            id: user.id,
            email: user.email,
            role: user.role,
        },
    };

    let mut response = Json(body).into_response();

    if transport.accepts_cookie() {
        let cookie = session_cookie(&token, ttl.num_seconds(), state.cookie_profile());
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::InternalError(format!("Invalid cookie header: {}", e)))?;
        response.headers_mut().insert(header::SET_COOKIE, value);
    }

    Ok(response)
}

/// Logout
///
/// Clears the session cookie. The token itself stays valid until it expires;
/// bearer clients simply discard it.
pub async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let cookie = clear_session_cookie(state.cookie_profile());
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie header: {}", e)))?;

    let mut response = Json(ApiResponse::message("Logged out successfully")).into_response();
    response.headers_mut().insert(header::SET_COOKIE, value);

    Ok(response)
}
