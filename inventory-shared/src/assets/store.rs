/// File storage for uploaded assets
///
/// [`AssetStore`] writes uploads below a root directory and hands back public
/// paths. Replacing the asset a document points to follows one fixed order,
/// implemented by [`AssetStore::commit`]:
///
/// ```text
/// store new file ──> write document ──ok──> discard superseded files (best-effort)
///                                    └─err─> discard the new files, return error
/// ```
///
/// Superseded files are never touched before the document write succeeds, so
/// a document never references a deleted file. A failed discard only leaves an
/// orphan on disk; it is logged and otherwise ignored.
///
/// # Example
///
/// ```no_run
/// use inventory_shared::assets::store::{AssetStore, Replacement};
///
/// # async fn example(store: AssetStore, png: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
/// let path = store.store(&png, "image/png", Some("logo.png")).await?;
///
/// let document = store
///     .commit(&[path.clone()], async {
///         // write `path` into the document, return the value it replaced
///         Ok::<_, std::io::Error>(Replacement {
///             document: path.clone(),
///             superseded: vec!["/uploads/images/old.png".to_string()],
///         })
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
use chrono::Utc;
use rand::Rng;
use std::{
    future::Future,
    path::{Component, Path, PathBuf},
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{classify, AssetError, MediaCategory, DEFAULT_MAX_UPLOAD_BYTES, PUBLIC_PREFIX};

/// Longest file extension kept from the original name
const MAX_EXTENSION_LEN: usize = 16;

/// Outcome of a document write that swapped asset references
#[derive(Debug, Clone)]
pub struct Replacement<T> {
    /// The document after the write
    pub document: T,

    /// Public paths the document referenced before and no longer does
    pub superseded: Vec<String>,
}

/// Stores uploads under a root directory, one subdirectory per category
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    max_bytes: u64,
}

impl AssetStore {
    /// Creates a store rooted at `root` with the given size limit
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Creates a store with the default 300 MiB limit
    pub fn with_default_limit(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Checks a running byte count against the limit
    ///
    /// Called while an upload is still streaming in, so an oversized body is
    /// rejected before anything reaches the disk.
    ///
    /// # Errors
    ///
    /// Returns `AssetError::TooLarge` once `received` exceeds the limit
    pub fn ensure_within_limit(&self, received: u64) -> Result<(), AssetError> {
        if received > self.max_bytes {
            return Err(AssetError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Writes an upload and returns its public path
    ///
    /// The file name is `<unix-millis>-<random><.ext>`, keeping the extension
    /// of `original_name`. The category directory is created if missing.
    ///
    /// # Errors
    ///
    /// - `TooLarge` if `content` exceeds the limit (nothing is written)
    /// - `UnsupportedMediaType` if `mime` is off the allow-list
    /// - `Io` on filesystem failure
    pub async fn store(
        &self,
        content: &[u8],
        mime: &str,
        original_name: Option<&str>,
    ) -> Result<String, AssetError> {
        let category = classify(mime)?;
        self.write(category, content, original_name).await
    }

    /// Like [`AssetStore::store`], but only accepts images
    ///
    /// # Errors
    ///
    /// Additionally returns `WrongCategory` for allowed non-image types
    pub async fn store_image(
        &self,
        content: &[u8],
        mime: &str,
        original_name: Option<&str>,
    ) -> Result<String, AssetError> {
        let category = classify(mime)?;
        if category != MediaCategory::Image {
            return Err(AssetError::WrongCategory {
                expected: MediaCategory::Image,
                actual: category,
            });
        }
        self.write(category, content, original_name).await
    }

    async fn write(
        &self,
        category: MediaCategory,
        content: &[u8],
        original_name: Option<&str>,
    ) -> Result<String, AssetError> {
        self.ensure_within_limit(content.len() as u64)?;

        let dir = self.root.join(category.dir_name());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = unique_file_name(original_name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&file_name))
            .await?;
        file.write_all(content).await?;
        file.flush().await?;

        let public_path = format!("{}/{}/{}", PUBLIC_PREFIX, category.dir_name(), file_name);
        info!(path = %public_path, bytes = content.len(), "Stored upload");

        Ok(public_path)
    }

    /// Maps a public path back to a file below the root
    ///
    /// Returns `None` for paths outside the public prefix or containing
    /// anything other than plain name segments (`..`, absolute parts).
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let relative = public_path
            .strip_prefix(PUBLIC_PREFIX)?
            .strip_prefix('/')?;

        let relative = Path::new(relative);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        if !plain || relative.as_os_str().is_empty() {
            return None;
        }

        Some(self.root.join(relative))
    }

    /// Deletes the file behind a public path, best-effort
    ///
    /// A missing file is fine. Any other failure is logged and swallowed.
    pub async fn discard(&self, public_path: &str) {
        let Some(path) = self.resolve(public_path) else {
            warn!(path = %public_path, "Refusing to delete asset outside upload root");
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %public_path, "Deleted asset"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %public_path, "Asset already gone")
            }
            Err(e) => warn!(path = %public_path, error = %e, "Failed to delete asset"),
        }
    }

    /// Discards every path in the list
    pub async fn discard_all<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths: Vec<S> = paths.into_iter().collect();
        futures::future::join_all(paths.iter().map(|p| self.discard(p.as_ref()))).await;
    }

    /// Runs a document write that references freshly stored files
    ///
    /// On success the superseded paths are discarded and the document is
    /// returned. On failure the `staged` files are discarded so they do not
    /// linger unreferenced, and the write's error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns whatever `write` returns
    pub async fn commit<T, E, Fut>(&self, staged: &[String], write: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<Replacement<T>, E>>,
    {
        match write.await {
            Ok(Replacement {
                document,
                superseded,
            }) => {
                // A path can be staged and superseded at once only if the write re-used it
                let stale = superseded.iter().filter(|path| !staged.contains(path));
                self.discard_all(stale).await;
                Ok(document)
            }
            Err(e) => {
                self.discard_all(staged).await;
                Err(e)
            }
        }
    }
}

/// `<unix-millis>-<0..1e9><.ext>`
fn unique_file_name(original_name: Option<&str>) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);

    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}-{}{}", millis, suffix, extension)
}
