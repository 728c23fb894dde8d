/// Document storage
///
/// Handlers talk to storage through two traits, one per collection. Both are
/// object-safe so the API holds them as `Arc<dyn UserRepository>` and
/// `Arc<dyn SettingsRepository>`.
///
/// # Implementations
///
/// - [`postgres`]: PostgreSQL via sqlx; uniqueness enforced by constraints
/// - [`memory`]: Mutex-guarded maps for tests and local runs
///
/// Both give the same guarantees: email uniqueness and the settings singleton
/// hold under concurrent writers, and `replace_avatar` / `upsert` report the
/// asset paths they displaced so the caller can clean them up.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{
    id::DocumentId,
    settings::{NewSettings, Settings, SettingsPatch, SettingsReplacement},
    user::{NewUser, User, UserCredentials, UserPatch},
};

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The singleton document already exists
    #[error("Document already exists")]
    AlreadyExists,

    /// Storage backend failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage for user documents
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user with role `user`
    ///
    /// # Errors
    ///
    /// `Conflict` if the (normalized) email is taken
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<User>, RepositoryError>;

    /// Looks a user up by normalized email, including the password hash
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError>;

    /// All users, newest first
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Applies the `Some` fields of a patch and bumps `updated_at`
    ///
    /// Returns `None` if the user does not exist.
    async fn update_fields(
        &self,
        id: &DocumentId,
        patch: UserPatch,
    ) -> Result<Option<User>, RepositoryError>;

    /// Points the user's avatar at `avatar`
    ///
    /// Returns `None` if the user does not exist, otherwise the updated user
    /// and the avatar path it replaced (if any).
    async fn replace_avatar(
        &self,
        id: &DocumentId,
        avatar: &str,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError>;

    /// Deletes the user and returns the removed document
    async fn delete(&self, id: &DocumentId) -> Result<Option<User>, RepositoryError>;
}

/// Storage for the basic-settings singleton
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn find(&self) -> Result<Option<Settings>, RepositoryError>;

    /// Creates the singleton
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a settings document is already stored
    async fn insert(&self, settings: NewSettings) -> Result<Settings, RepositoryError>;

    /// Updates the singleton, creating it if missing
    ///
    /// `updated_at` is always refreshed. The replacement lists logo/favicon
    /// paths the write displaced.
    async fn upsert(&self, patch: SettingsPatch) -> Result<SettingsReplacement, RepositoryError>;

    /// Deletes the singleton and returns it
    async fn delete(&self) -> Result<Option<Settings>, RepositoryError>;
}
