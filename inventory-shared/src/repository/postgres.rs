/// PostgreSQL repositories
///
/// Email uniqueness rests on the `users_email_key` constraint and the settings
/// singleton on the `basic_settings.singleton` primary key, so concurrent
/// writers cannot break either invariant. Read-modify-write paths (avatar
/// replacement, settings upsert) lock the row with `SELECT ... FOR UPDATE`
/// inside a transaction so the displaced paths they report are exact.
///
/// # Example
///
/// ```no_run
/// use inventory_shared::repository::{postgres::PgUserRepository, UserRepository};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let users = PgUserRepository::new(pool);
/// for user in users.list().await? {
///     println!("{} ({})", user.email, user.role);
/// }
/// # Ok(())
/// # }
/// ```
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use super::{RepositoryError, SettingsRepository, UserRepository};
use crate::models::{
    id::DocumentId,
    settings::{NewSettings, Settings, SettingsPatch, SettingsReplacement},
    user::{normalize_email, NewUser, User, UserCredentials, UserPatch},
};

const USER_COLUMNS: &str =
    "id, email, role, status, full_name, avatar, created_at, updated_at";

const SETTINGS_COLUMNS: &str = "id, website_name, logo, favicon, created_at, updated_at";

/// Maps unique violations to `Conflict`, everything else to `Database`
fn map_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(format!("{} already exists", what))
        }
        _ => RepositoryError::Database(err),
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Users stored in the `users` table
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO users (id, email, password_hash, full_name)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(DocumentId::new())
            .bind(normalize_email(&user.email))
            .bind(user.password_hash)
            .bind(user.full_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, "User"))?;

        debug!(user_id = %user.id, "Inserted user");
        Ok(user)
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let query = format!(
            "SELECT {}, password_hash FROM users WHERE email = $1",
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, CredentialsRow>(&query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| UserCredentials {
            user: row.user,
            password_hash: row.password_hash,
        }))
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
            USER_COLUMNS
        );

        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn update_fields(
        &self,
        id: &DocumentId,
        patch: UserPatch,
    ) -> Result<Option<User>, RepositoryError> {
        // Build the SET list from the fields present in the patch
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if patch.full_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", full_name = ${}", bind_count));
        }
        if patch.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if patch.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if patch.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(full_name) = patch.full_name {
            q = q.bind(full_name);
        }
        if let Some(password_hash) = patch.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(role) = patch.role {
            q = q.bind(role);
        }
        if let Some(status) = patch.status {
            q = q.bind(status);
        }

        let user = q.fetch_optional(&self.pool).await?;

        Ok(user)
    }

    async fn replace_avatar(
        &self,
        id: &DocumentId,
        avatar: &str,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<(Option<String>,)> =
            sqlx::query_as("SELECT avatar FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((previous,)) = previous else {
            return Ok(None);
        };

        let query = format!(
            "UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(avatar)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let superseded = previous.filter(|old| old != avatar);
        Ok(Some((user, superseded)))
    }

    async fn delete(&self, id: &DocumentId) -> Result<Option<User>, RepositoryError> {
        let query = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

/// The settings singleton stored in `basic_settings`
#[derive(Debug, Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_current(
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Settings>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM basic_settings WHERE singleton FOR UPDATE",
            SETTINGS_COLUMNS
        );
        sqlx::query_as::<_, Settings>(&query)
            .fetch_optional(&mut **tx)
            .await
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn find(&self) -> Result<Option<Settings>, RepositoryError> {
        let query = format!("SELECT {} FROM basic_settings WHERE singleton", SETTINGS_COLUMNS);

        let settings = sqlx::query_as::<_, Settings>(&query)
            .fetch_optional(&self.pool)
            .await?;

        Ok(settings)
    }

    async fn insert(&self, settings: NewSettings) -> Result<Settings, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO basic_settings (id, website_name, logo, favicon)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (singleton) DO NOTHING
            RETURNING {}
            "#,
            SETTINGS_COLUMNS
        );

        sqlx::query_as::<_, Settings>(&query)
            .bind(DocumentId::new())
            .bind(settings.website_name)
            .bind(settings.logo)
            .bind(settings.favicon)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::AlreadyExists)
    }

    async fn upsert(&self, patch: SettingsPatch) -> Result<SettingsReplacement, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut current = Self::lock_current(&mut tx).await?;

        if current.is_none() {
            let query = format!(
                r#"
                INSERT INTO basic_settings (id, website_name, logo, favicon)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (singleton) DO NOTHING
                RETURNING {}
                "#,
                SETTINGS_COLUMNS
            );

            let inserted = sqlx::query_as::<_, Settings>(&query)
                .bind(DocumentId::new())
                .bind(patch.website_name.clone().unwrap_or_default())
                .bind(patch.logo.clone())
                .bind(patch.favicon.clone())
                .fetch_optional(&mut *tx)
                .await?;

            if let Some(settings) = inserted {
                tx.commit().await?;
                debug!("Created settings on upsert");
                return Ok(SettingsReplacement {
                    settings,
                    superseded: Vec::new(),
                });
            }

            // A concurrent writer created the row first; update it instead
            current = Self::lock_current(&mut tx).await?;
        }

        let superseded = current
            .as_ref()
            .map(|settings| settings.superseded_by(&patch))
            .unwrap_or_default();

        let query = format!(
            r#"
            UPDATE basic_settings SET
                website_name = COALESCE($1, website_name),
                logo = COALESCE($2, logo),
                favicon = COALESCE($3, favicon),
                updated_at = NOW()
            WHERE singleton
            RETURNING {}
            "#,
            SETTINGS_COLUMNS
        );

        let settings = sqlx::query_as::<_, Settings>(&query)
            .bind(patch.website_name)
            .bind(patch.logo)
            .bind(patch.favicon)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(SettingsReplacement {
            settings,
            superseded,
        })
    }

    async fn delete(&self) -> Result<Option<Settings>, RepositoryError> {
        let query = format!("DELETE FROM basic_settings RETURNING {}", SETTINGS_COLUMNS);

        let settings = sqlx::query_as::<_, Settings>(&query)
            .fetch_optional(&self.pool)
            .await?;

        Ok(settings)
    }
}
