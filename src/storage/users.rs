//! User account persistence: the port the resolver depends on, and its
//! SQLite adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use super::errors::StorageError;
use crate::auth::models::{NewUserAccount, UserAccount, UserAccountUpdate};
use crate::common::{generate_user_id, safe_email_log};

/// Single-record access to user accounts.
///
/// Implementations must enforce uniqueness of `email` and of non-null
/// `external_subject_id`, reporting violations as engine errors.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StorageError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserAccount>, StorageError>;

    async fn create(&self, fields: NewUserAccount) -> Result<UserAccount, StorageError>;

    /// Fails with [`StorageError::RecordNotFound`] when no row has `id`.
    ///
    /// Setting `external_subject_id` on an account that is already linked
    /// changes nothing and returns the stored account.
    async fn update_by_id(
        &self,
        id: &str,
        fields: UserAccountUpdate,
    ) -> Result<UserAccount, StorageError>;
}

#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    db: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn fetch_by_id(&self, id: &str) -> Result<UserAccount, StorageError> {
        let user = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StorageError> {
        let user = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserAccount>, StorageError> {
        let user = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn create(&self, fields: NewUserAccount) -> Result<UserAccount, StorageError> {
        let id = generate_user_id();
        debug!(
            user_id = %id,
            email = %safe_email_log(&fields.email),
            "Inserting user account"
        );

        sqlx::query(
            r#"
            INSERT INTO users (id, email, external_subject_id, display_name, avatar_url, role, onboarded)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&fields.email)
        .bind(fields.external_subject_id.as_deref())
        .bind(&fields.display_name)
        .bind(fields.avatar_url.as_deref())
        .bind(fields.role)
        .bind(fields.onboarded)
        .execute(&self.db)
        .await?;

        self.fetch_by_id(&id).await
    }

    async fn update_by_id(
        &self,
        id: &str,
        fields: UserAccountUpdate,
    ) -> Result<UserAccount, StorageError> {
        // a subject id, once set, is never replaced
        let result = sqlx::query(
            r#"
            UPDATE users
            SET external_subject_id = COALESCE(?, external_subject_id),
                avatar_url = COALESCE(?, avatar_url),
                updated_at = datetime('now')
            WHERE id = ? AND (? IS NULL OR external_subject_id IS NULL)
            "#,
        )
        .bind(fields.external_subject_id.as_deref())
        .bind(fields.avatar_url.as_deref())
        .bind(id)
        .bind(fields.external_subject_id.as_deref())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.find_by_id(id).await?;
            return match current {
                Some(account) => {
                    debug!(user_id = %account.id, "Account already linked, update skipped");
                    Ok(account)
                }
                None => Err(StorageError::RecordNotFound),
            };
        }

        self.fetch_by_id(id).await
    }
}
