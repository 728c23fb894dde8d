/// In-memory repositories
///
/// Used by the API test-suite and for running the server without a database.
/// Each repository keeps its documents behind one `tokio::sync::Mutex`, so
/// every operation is atomic with respect to the others and the uniqueness
/// and singleton rules hold exactly as they do in PostgreSQL.
///
/// [`MemoryUserRepository::set_unavailable`] and its settings counterpart make
/// every call fail with a database error, to exercise failure paths.
///
/// # Example
///
/// ```
/// use inventory_shared::models::user::NewUser;
/// use inventory_shared::repository::{memory::MemoryUserRepository, UserRepository};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let users = MemoryUserRepository::new();
/// let user = users
///     .insert(NewUser {
///         email: "Ada@X.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         full_name: "Ada".to_string(),
///     })
///     .await?;
/// assert_eq!(user.email, "ada@x.com");
/// # Ok(())
/// # }
/// ```
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{RepositoryError, SettingsRepository, UserRepository};
use crate::models::{
    id::DocumentId,
    settings::{NewSettings, Settings, SettingsPatch, SettingsReplacement},
    user::{normalize_email, NewUser, User, UserCredentials, UserPatch, UserRole},
};

fn unavailable() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

/// Users kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<UserCredentials>>,
    unavailable: AtomicBool,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.check_available()?;

        let email = normalize_email(&user.email);
        let mut users = self.users.lock().await;

        if users.iter().any(|stored| stored.user.email == email) {
            return Err(RepositoryError::Conflict("User already exists".to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: DocumentId::new(),
            email,
            role: UserRole::User,
            status: None,
            full_name: user.full_name,
            avatar: None,
            created_at: now,
            updated_at: now,
        };

        users.push(UserCredentials {
            user: created.clone(),
            password_hash: user.password_hash,
        });

        Ok(created)
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;

        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|stored| &stored.user.id == id)
            .map(|stored| stored.user.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        self.check_available()?;

        let email = normalize_email(email);
        let users = self.users.lock().await;
        Ok(users.iter().find(|stored| stored.user.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        self.check_available()?;

        let users = self.users.lock().await;
        Ok(users.iter().rev().map(|stored| stored.user.clone()).collect())
    }

    async fn update_fields(
        &self,
        id: &DocumentId,
        patch: UserPatch,
    ) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;

        let mut users = self.users.lock().await;
        let Some(stored) = users.iter_mut().find(|stored| &stored.user.id == id) else {
            return Ok(None);
        };

        if let Some(full_name) = patch.full_name {
            stored.user.full_name = full_name;
        }
        if let Some(password_hash) = patch.password_hash {
            stored.password_hash = password_hash;
        }
        if let Some(role) = patch.role {
            stored.user.role = role;
        }
        if let Some(status) = patch.status {
            stored.user.status = Some(status);
        }
        stored.user.updated_at = Utc::now();

        Ok(Some(stored.user.clone()))
    }

    async fn replace_avatar(
        &self,
        id: &DocumentId,
        avatar: &str,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        self.check_available()?;

        let mut users = self.users.lock().await;
        let Some(stored) = users.iter_mut().find(|stored| &stored.user.id == id) else {
            return Ok(None);
        };

        let previous = stored.user.avatar.replace(avatar.to_string());
        stored.user.updated_at = Utc::now();

        let superseded = previous.filter(|old| old != avatar);
        Ok(Some((stored.user.clone(), superseded)))
    }

    async fn delete(&self, id: &DocumentId) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;

        let mut users = self.users.lock().await;
        let position = users.iter().position(|stored| &stored.user.id == id);
        Ok(position.map(|index| users.remove(index).user))
    }
}

/// At most one settings document
#[derive(Debug, Default)]
pub struct MemorySettingsRepository {
    settings: Mutex<Option<Settings>>,
    unavailable: AtomicBool,
}

impl MemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn find(&self) -> Result<Option<Settings>, RepositoryError> {
        self.check_available()?;
        Ok(self.settings.lock().await.clone())
    }

    async fn insert(&self, settings: NewSettings) -> Result<Settings, RepositoryError> {
        self.check_available()?;

        let mut slot = self.settings.lock().await;
        if slot.is_some() {
            return Err(RepositoryError::AlreadyExists);
        }

        let now = Utc::now();
        let created = Settings {
            id: DocumentId::new(),
            website_name: settings.website_name,
            logo: settings.logo,
            favicon: settings.favicon,
            created_at: now,
            updated_at: now,
        };
        *slot = Some(created.clone());

        Ok(created)
    }

    async fn upsert(&self, patch: SettingsPatch) -> Result<SettingsReplacement, RepositoryError> {
        self.check_available()?;

        let mut slot = self.settings.lock().await;
        let now = Utc::now();

        let Some(current) = slot.as_mut() else {
            let created = Settings {
                id: DocumentId::new(),
                website_name: patch.website_name.unwrap_or_default(),
                logo: patch.logo,
                favicon: patch.favicon,
                created_at: now,
                updated_at: now,
            };
            *slot = Some(created.clone());

            return Ok(SettingsReplacement {
                settings: created,
                superseded: Vec::new(),
            });
        };

        let superseded = current.superseded_by(&patch);

        if let Some(website_name) = patch.website_name {
            current.website_name = website_name;
        }
        if let Some(logo) = patch.logo {
            current.logo = Some(logo);
        }
        if let Some(favicon) = patch.favicon {
            current.favicon = Some(favicon);
        }
        current.updated_at = now;

        Ok(SettingsReplacement {
            settings: current.clone(),
            superseded,
        })
    }

    async fn delete(&self) -> Result<Option<Settings>, RepositoryError> {
        self.check_available()?;
        Ok(self.settings.lock().await.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserStatus;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            full_name: "Test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_normalizes_and_defaults_role() {
        let repo = MemoryUserRepository::new();
        let user = repo.insert(new_user(" Ada@Example.COM ")).await.unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, UserRole::User);
        assert!(user.avatar.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_case_insensitively() {
        let repo = MemoryUserRepository::new();
        repo.insert(new_user("a@x.com")).await.unwrap();

        let result = repo.insert(new_user("A@X.COM")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_yield_one_user() {
        let repo = Arc::new(MemoryUserRepository::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.insert(new_user("race@x.com")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_credentials_lookup() {
        let repo = MemoryUserRepository::new();
        repo.insert(new_user("a@x.com")).await.unwrap();

        let creds = repo.find_credentials_by_email("A@x.com").await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "hash");
        assert!(repo.find_credentials_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let repo = MemoryUserRepository::new();
        repo.insert(new_user("first@x.com")).await.unwrap();
        repo.insert(new_user("second@x.com")).await.unwrap();

        let emails: Vec<String> = repo.list().await.unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["second@x.com", "first@x.com"]);
    }

    #[tokio::test]
    async fn test_update_fields() {
        let repo = MemoryUserRepository::new();
        let user = repo.insert(new_user("a@x.com")).await.unwrap();

        let patch = UserPatch {
            role: Some(UserRole::Manager),
            status: Some(UserStatus::Inactive),
            password_hash: Some("new-hash".to_string()),
            ..Default::default()
        };
        let updated = repo.update_fields(&user.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.role, UserRole::Manager);
        assert_eq!(updated.status, Some(UserStatus::Inactive));
        assert_eq!(updated.full_name, "Test");
        assert!(updated.updated_at >= user.updated_at);

        let creds = repo.find_credentials_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "new-hash");

        let missing = repo.update_fields(&DocumentId::new(), UserPatch::default()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_replace_avatar_reports_previous() {
        let repo = MemoryUserRepository::new();
        let user = repo.insert(new_user("a@x.com")).await.unwrap();

        let (_, previous) = repo.replace_avatar(&user.id, "/uploads/images/1.png").await.unwrap().unwrap();
        assert!(previous.is_none());

        let (updated, previous) =
            repo.replace_avatar(&user.id, "/uploads/images/2.png").await.unwrap().unwrap();
        assert_eq!(updated.avatar.as_deref(), Some("/uploads/images/2.png"));
        assert_eq!(previous.as_deref(), Some("/uploads/images/1.png"));

        assert!(repo.replace_avatar(&DocumentId::new(), "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_returns_document() {
        let repo = MemoryUserRepository::new();
        let user = repo.insert(new_user("a@x.com")).await.unwrap();

        let deleted = repo.delete(&user.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, user.id);
        assert!(repo.find_by_id(&user.id).await.unwrap().is_none());
        assert!(repo.delete(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let repo = MemoryUserRepository::new();
        repo.set_unavailable(true);
        assert!(matches!(repo.list().await, Err(RepositoryError::Database(_))));

        repo.set_unavailable(false);
        assert!(repo.list().await.is_ok());
    }

    #[tokio::test]
    async fn test_settings_singleton() {
        let repo = MemorySettingsRepository::new();
        assert!(repo.find().await.unwrap().is_none());

        repo.insert(NewSettings {
            website_name: "Shop".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let second = repo.insert(NewSettings::default()).await;
        assert!(matches!(second, Err(RepositoryError::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_settings_upsert_creates_then_merges() {
        let repo = MemorySettingsRepository::new();

        let created = repo
            .upsert(SettingsPatch {
                logo: Some("/uploads/images/logo-1.png".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.settings.website_name, "");
        assert!(created.superseded.is_empty());

        let updated = repo
            .upsert(SettingsPatch {
                website_name: Some("Shop".to_string()),
                logo: Some("/uploads/images/logo-2.png".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.settings.id, created.settings.id);
        assert_eq!(updated.settings.website_name, "Shop");
        assert_eq!(updated.superseded, vec!["/uploads/images/logo-1.png".to_string()]);
        assert!(updated.settings.updated_at >= created.settings.updated_at);
    }

    #[tokio::test]
    async fn test_settings_delete() {
        let repo = MemorySettingsRepository::new();
        assert!(repo.delete().await.unwrap().is_none());

        repo.insert(NewSettings::default()).await.unwrap();
        assert!(repo.delete().await.unwrap().is_some());
        assert!(repo.find().await.unwrap().is_none());
    }
}
