/// Request extractors
///
/// - [`CurrentUser`]: the verified session identity left by the auth layer
/// - [`ValidatedJson`]: JSON body that is deserialized and then checked with
///   `validator`; both failures render as the standard error envelope
/// - [`UploadForm`]: a multipart form read field by field, with file parts
///   size-checked while they stream in
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::request::Parts,
    Json,
};
use bytes::{Bytes, BytesMut};
use inventory_shared::{
    assets::{classify, store::AssetStore, AssetError, MediaCategory},
    auth::{authorization::require_authenticated, middleware::AuthContext},
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use validator::Validate;

use crate::error::{ApiError, ApiResult};

/// Longest accepted text field in a multipart form
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// The caller's verified identity
///
/// Rejects with 401 when the session layer did not run for the route.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = require_authenticated(parts.extensions.get::<AuthContext>())?;
        Ok(CurrentUser(auth.clone()))
    }
}

/// JSON body that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate().map_err(ApiError::from_validation)?;
        Ok(ValidatedJson(value))
    }
}

/// A file part of a multipart form, fully read into memory
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub content: Bytes,
}

/// A multipart form split into text fields and image files
#[derive(Debug, Default)]
pub struct UploadForm {
    pub text: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl UploadForm {
    /// Reads every part of the form
    ///
    /// Parts named in `image_fields` are treated as image uploads: their
    /// content type is checked before the body is read, and the running size
    /// is checked against the store's limit after every chunk. Other parts
    /// are read as text. File parts with an empty body are ignored, matching
    /// a form submitted without choosing a file.
    ///
    /// # Errors
    ///
    /// - `UnsupportedMediaType` for a non-image or unknown file type
    /// - `PayloadTooLarge` once a file exceeds the limit
    /// - `BadRequest` for duplicate or malformed fields
    pub async fn read(
        mut multipart: Multipart,
        store: &AssetStore,
        image_fields: &[&str],
    ) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if form.text.contains_key(&name) || form.files.contains_key(&name) {
                return Err(ApiError::BadRequest(format!("Duplicate field: {}", name)));
            }

            if image_fields.contains(&name.as_str()) {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().unwrap_or_default().to_string();

                let mut content = BytesMut::new();
                let mut checked = false;
                while let Some(chunk) = field.chunk().await? {
                    if !checked {
                        require_image(&content_type)?;
                        checked = true;
                    }
                    content.extend_from_slice(&chunk);
                    store.ensure_within_limit(content.len() as u64)?;
                }

                if content.is_empty() {
                    continue;
                }

                form.files.insert(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        content: content.freeze(),
                    },
                );
            } else {
                let mut value = BytesMut::new();
                while let Some(chunk) = field.chunk().await? {
                    value.extend_from_slice(&chunk);
                    if value.len() > MAX_TEXT_FIELD_BYTES {
                        return Err(ApiError::BadRequest(format!("Field too long: {}", name)));
                    }
                }

                let value = String::from_utf8(value.to_vec())
                    .map_err(|_| ApiError::BadRequest(format!("Field is not UTF-8: {}", name)))?;
                form.text.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Removes and returns a file part
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// Removes and returns a text field
    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.text.remove(name)
    }
}

fn require_image(content_type: &str) -> Result<(), AssetError> {
    let category = classify(content_type)?;
    if category != MediaCategory::Image {
        return Err(AssetError::WrongCategory {
            expected: MediaCategory::Image,
            actual: category,
        });
    }
    Ok(())
}
