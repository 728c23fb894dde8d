/// Basic settings endpoints
///
/// A single site-wide document holding the website name, logo and favicon.
/// Every verb requires an admin session.
///
/// # Endpoints
///
/// - `GET    /api/basic-settings` - Fetch the document (`data` is `null` when none exists)
/// - `POST   /api/basic-settings` - Create it; fails if it already exists
/// - `PATCH  /api/basic-settings` - Update it, creating it if missing
/// - `DELETE /api/basic-settings` - Delete it and its images
///
/// POST and PATCH take `multipart/form-data` with a `websiteName` text field
/// and optional `logo` / `favicon` image files.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{CurrentUser, UploadForm},
    routes::ApiResponse,
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use inventory_shared::{
    assets::store::Replacement,
    auth::authorization::require_role,
    models::{
        settings::{NewSettings, Settings, SettingsPatch},
        user::UserRole,
    },
    repository::RepositoryError,
};
use tracing::info;

pub const WEBSITE_NAME_FIELD: &str = "websiteName";
pub const LOGO_FIELD: &str = "logo";
pub const FAVICON_FIELD: &str = "favicon";

const ALREADY_EXISTS: &str = "Setting already exist. use patch to update";

/// Text and stored image paths taken from a settings form
struct SettingsInput {
    website_name: Option<String>,
    logo: Option<String>,
    favicon: Option<String>,
}

impl SettingsInput {
    /// Paths written by this request, to discard if the document write fails
    fn staged(&self) -> Vec<String> {
        self.logo.iter().chain(self.favicon.iter()).cloned().collect()
    }
}

/// Reads the form and stores any images it carries
///
/// An empty `websiteName` is treated as absent, so a form that only swaps an
/// image keeps the stored name. If storing the second image fails, the first
/// is discarded again.
async fn read_settings_form(state: &AppState, multipart: Multipart) -> ApiResult<SettingsInput> {
    let mut form =
        UploadForm::read(multipart, &state.assets, &[LOGO_FIELD, FAVICON_FIELD]).await?;

    let mut input = SettingsInput {
        website_name: form
            .take_text(WEBSITE_NAME_FIELD)
            .filter(|name| !name.is_empty()),
        logo: None,
        favicon: None,
    };

    for field in [LOGO_FIELD, FAVICON_FIELD] {
        let Some(file) = form.take_file(field) else {
            continue;
        };

        let stored = state
            .assets
            .store_image(&file.content, &file.content_type, file.file_name.as_deref())
            .await;

        let path = match stored {
            Ok(path) => path,
            Err(e) => {
                state.assets.discard_all(input.staged()).await;
                return Err(e.into());
            }
        };

        if field == LOGO_FIELD {
            input.logo = Some(path);
        } else {
            input.favicon = Some(path);
        }
    }

    Ok(input)
}

/// Fetch the settings document
pub async fn get_settings(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<Json<ApiResponse<Option<Settings>>>> {
    require_role(&auth, UserRole::Admin)?;

    let settings = state.settings.find().await?;

    Ok(Json(
        ApiResponse::data(settings).with_message("Website settings fetched"),
    ))
}

/// Create the settings document
///
/// # Errors
///
/// - `400 Bad Request`: A settings document already exists
/// - `403 Forbidden`: Caller is not an admin
/// - `413` / `415`: Image too large or not an image
pub async fn create_settings(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<Settings>>)> {
    require_role(&auth, UserRole::Admin)?;

    // Fail early without storing uploads; the insert below still closes the race
    if state.settings.find().await?.is_some() {
        return Err(ApiError::BadRequest(ALREADY_EXISTS.to_string()));
    }

    let input = read_settings_form(&state, multipart).await?;
    let staged = input.staged();

    let settings = state
        .assets
        .commit(&staged, async {
            let settings = state
                .settings
                .insert(NewSettings {
                    website_name: input.website_name.unwrap_or_default(),
                    logo: input.logo,
                    favicon: input.favicon,
                })
                .await
                .map_err(|e| match e {
                    RepositoryError::AlreadyExists => ApiError::BadRequest(ALREADY_EXISTS.to_string()),
                    other => other.into(),
                })?;

            Ok::<_, ApiError>(Replacement {
                document: settings,
                superseded: Vec::new(),
            })
        })
        .await?;

    info!(created_by = %auth.user_id, "Settings created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(settings).with_message("Setting Created")),
    ))
}

/// Update the settings document, creating it if missing
///
/// Fields absent from the form keep their stored values. A replaced logo or
/// favicon file is deleted after the document is written.
pub async fn update_settings(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<Settings>>> {
    require_role(&auth, UserRole::Admin)?;

    let input = read_settings_form(&state, multipart).await?;
    let staged = input.staged();

    let patch = SettingsPatch {
        website_name: input.website_name,
        logo: input.logo,
        favicon: input.favicon,
    };

    let settings = state
        .assets
        .commit(&staged, async {
            let replacement = state.settings.upsert(patch).await?;

            Ok::<_, ApiError>(Replacement {
                document: replacement.settings,
                superseded: replacement.superseded,
            })
        })
        .await?;

    info!(updated_by = %auth.user_id, "Settings updated");

    Ok(Json(
        ApiResponse::data(settings).with_message("Settings updated successfully"),
    ))
}

/// Delete the settings document and its images
///
/// # Errors
///
/// - `404 Not Found`: No settings document exists
pub async fn delete_settings(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> ApiResult<Json<ApiResponse<()>>> {
    require_role(&auth, UserRole::Admin)?;

    let settings = state
        .settings
        .delete()
        .await?
        .ok_or_else(|| ApiError::NotFound("No settings found to delete".to_string()))?;

    state.assets.discard_all(settings.asset_paths()).await;

    info!(deleted_by = %auth.user_id, "Settings deleted");

    Ok(Json(ApiResponse::message("Settings deleted successfully")))
}
