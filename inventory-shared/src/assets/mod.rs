/// Uploaded asset handling
///
/// Uploads are sorted into a category directory by MIME type, written under a
/// unique name, and referenced from documents by their public path
/// (`/uploads/<category>/<file>`).
///
/// # Modules
///
/// - [`store`]: Writing, resolving and discarding files, and the replacement protocol
///
/// # Allowed types
///
/// | category | MIME types |
/// |----------|------------|
/// | image    | image/jpeg, image/png, image/webp, image/gif |
/// | video    | video/mp4, video/mkv, video/mov |
/// | file     | application/pdf, application/msword, .docx, text/plain |
///
/// Anything else is rejected; there is no catch-all category.

pub mod store;

use std::fmt;

/// Maximum upload size: 300 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 300 * 1024 * 1024;

/// URL prefix under which the upload root is served
pub const PUBLIC_PREFIX: &str = "/uploads";

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

const VIDEO_TYPES: &[&str] = &["video/mp4", "video/mkv", "video/mov"];

const FILE_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Error type for asset operations
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// Upload exceeds the configured size limit
    #[error("File too large: limit is {limit} bytes")]
    TooLarge { limit: u64 },

    /// MIME type is not on the allow-list
    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),

    /// Allowed type, but the field requires another category
    #[error("Expected {expected} upload, got {actual}")]
    WrongCategory {
        expected: MediaCategory,
        actual: MediaCategory,
    },

    /// Filesystem failure
    #[error("Asset I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse media category; also the name of the storage subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    Image,
    Video,
    File,
}

impl MediaCategory {
    /// Directory name under the upload root
    pub fn dir_name(&self) -> &'static str {
        match self {
            MediaCategory::Image => "images",
            MediaCategory::Video => "videos",
            MediaCategory::File => "files",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::File => "file",
        };
        f.write_str(name)
    }
}

/// Maps a MIME type to its category
///
/// Parameters such as `; charset=utf-8` are ignored and matching is
/// case-insensitive.
///
/// # Errors
///
/// Returns `AssetError::UnsupportedMediaType` for anything off the allow-list
///
/// # Example
///
/// ```
/// use inventory_shared::assets::{classify, MediaCategory};
///
/// assert_eq!(classify("image/png").unwrap(), MediaCategory::Image);
/// assert_eq!(classify("text/plain; charset=utf-8").unwrap(), MediaCategory::File);
/// assert!(classify("application/x-msdownload").is_err());
/// ```
pub fn classify(mime: &str) -> Result<MediaCategory, AssetError> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if IMAGE_TYPES.contains(&essence.as_str()) {
        Ok(MediaCategory::Image)
    } else if VIDEO_TYPES.contains(&essence.as_str()) {
        Ok(MediaCategory::Video)
    } else if FILE_TYPES.contains(&essence.as_str()) {
        Ok(MediaCategory::File)
    } else {
        Err(AssetError::UnsupportedMediaType(mime.to_string()))
    }
}
