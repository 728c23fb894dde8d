/// User management endpoints
///
/// All routes here sit behind the session authentication layer.
///
/// # Endpoints
///
/// - `GET    /api/users` - List users, newest first
/// - `GET    /api/users/:id` - Get one user
/// - `PATCH  /api/users/:id` - Update name/password (self or admin), role/status (admin)
/// - `PATCH  /api/users/:id/avatar` - Replace the avatar image (multipart field `avatar`)
/// - `DELETE /api/users/:id` - Delete a user and their avatar (self or admin)
///
/// Responses never include password hashes; the `User` type has no such field.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{CurrentUser, UploadForm, ValidatedJson},
    routes::ApiResponse,
};
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use inventory_shared::{
    assets::store::Replacement,
    auth::{
        authorization::{authorize_user_patch, require_self_or_admin, PatchFields},
        password::validate_password_length,
    },
    models::{
        id::DocumentId,
        user::{User, UserPatch, UserRole, UserStatus},
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Multipart field carrying the avatar image
pub const AVATAR_FIELD: &str = "avatar";

/// Update request; empty strings count as absent
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    pub full_name: Option<String>,

    pub password: Option<String>,

    pub role: Option<String>,

    pub status: Option<String>,
}

/// Avatar upload response
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub success: bool,
    pub message: &'static str,

    /// Public path of the new avatar
    pub avatar: String,

    pub data: User,
}

fn parse_user_id(raw: &str) -> ApiResult<DocumentId> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid User ID".to_string()))
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// List all users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.users.list().await?;
    Ok(Json(ApiResponse::data(users)))
}

/// Get a user by ID
///
/// # Errors
///
/// - `400 Bad Request`: Malformed ID
/// - `404 Not Found`: No such user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let id = parse_user_id(&id)?;

    let user = state.users.find_by_id(&id).await?.ok_or_else(user_not_found)?;

    Ok(Json(ApiResponse::data(user)))
}

/// Update a user
///
/// Role and status may only be changed by an admin, on any record including
/// the admin's own; a non-admin sending either gets 403 whatever the value.
/// Any other caller may only change `fullName` and `password` on their own
/// record. Nothing is written when a check fails.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed ID, short password, unknown role/status (admin), empty update
/// - `403 Forbidden`: Role/status change by a non-admin, or someone else's record
/// - `404 Not Found`: No such user
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let id = parse_user_id(&id)?;

    let role = non_empty(req.role);
    let status = non_empty(req.status);
    let password = non_empty(req.password);

    // Authorize on field presence before parsing or hashing anything
    authorize_user_patch(
        &auth,
        &id,
        PatchFields {
            role: role.is_some(),
            status: status.is_some(),
        },
    )?;

    let role = role
        .map(|role| role.parse::<UserRole>())
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid Role".to_string()))?;

    let status = status
        .map(|status| status.parse::<UserStatus>())
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid Status value".to_string()))?;

    let mut patch = UserPatch {
        full_name: non_empty(req.full_name),
        password_hash: None,
        role,
        status,
    };

    if patch.is_empty() && password.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    if let Some(password) = password {
        validate_password_length(&password).map_err(|message| {
            ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "password".to_string(),
                message,
            }])
        })?;
        patch.password_hash = Some(state.credentials.hash_blocking(password).await?);
    }

    let user = state
        .users
        .update_fields(&id, patch)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = %user.id, updated_by = %auth.user_id, "User updated");

    Ok(Json(
        ApiResponse::data(user).with_message("User update successfully"),
    ))
}

/// Replace a user's avatar
///
/// The new image is stored first, then the user document is pointed at it,
/// and only then is the previous image deleted. If the document write fails
/// the new image is deleted and the old one is left in place.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed ID, no `avatar` file part
/// - `403 Forbidden`: Someone else's record
/// - `404 Not Found`: No such user
/// - `413 Payload Too Large`: Image exceeds the upload limit
/// - `415 Unsupported Media Type`: Not an image
pub async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let id = parse_user_id(&id)?;
    require_self_or_admin(&auth, &id)?;

    let mut form = UploadForm::read(multipart, &state.assets, &[AVATAR_FIELD]).await?;
    let file = form
        .take_file(AVATAR_FIELD)
        .ok_or_else(|| ApiError::BadRequest("No image uploaded".to_string()))?;

    let path = state
        .assets
        .store_image(&file.content, &file.content_type, file.file_name.as_deref())
        .await?;

    let user = state
        .assets
        .commit(&[path.clone()], async {
            let (user, previous) = state
                .users
                .replace_avatar(&id, &path)
                .await?
                .ok_or_else(user_not_found)?;

            Ok::<_, ApiError>(Replacement {
                document: user,
                superseded: previous.into_iter().collect(),
            })
        })
        .await?;

    info!(user_id = %user.id, avatar = %path, "Avatar updated");

    Ok(Json(AvatarResponse {
        success: true,
        message: "Profile Image Updated",
        avatar: path,
        data: user,
    }))
}

/// Delete a user
///
/// The avatar file is removed after the document, best-effort.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed ID
/// - `403 Forbidden`: Someone else's record
/// - `404 Not Found`: No such user
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let id = parse_user_id(&id)?;
    require_self_or_admin(&auth, &id)?;

    let user = state.users.delete(&id).await?.ok_or_else(user_not_found)?;

    if let Some(avatar) = &user.avatar {
        state.assets.discard(avatar).await;
    }

    info!(user_id = %user.id, deleted_by = %auth.user_id, "User deleted");

    Ok(Json(ApiResponse::message("User deleted Successfully")))
}
