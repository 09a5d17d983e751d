use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Holds digests only, never plaintext secrets;
/// `refresh_token_hash` is the fingerprint of the single live refresh token,
/// `None` when no session is active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    Duplicate,
    #[error("credential store unavailable")]
    Unavailable(#[from] sqlx::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Atomic create-or-fail on the unique email index.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    /// Unconditional overwrite of the stored refresh fingerprint.
    async fn store_refresh_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError>;

    /// Compare-and-swap: replaces the fingerprint only while it still equals
    /// `expected`. Returns false when another rotation got there first.
    async fn rotate_refresh_hash(
        &self,
        id: Uuid,
        expected: &str,
        new_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Clears the fingerprint; a no-op when no session is active.
    async fn clear_refresh_hash(&self, id: Uuid) -> Result<(), StoreError>;
}

pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, refresh_token_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, refresh_token_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, refresh_token_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                StoreError::Duplicate
            } else {
                StoreError::Unavailable(e)
            }
        })?;
        Ok(user)
    }

    async fn store_refresh_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users SET refresh_token_hash = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(hash)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn rotate_refresh_hash(
        &self,
        id: Uuid,
        expected: &str,
        new_hash: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $3
            WHERE id = $1 AND refresh_token_hash = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new_hash)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_hash(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = NULL
            WHERE id = $1 AND refresh_token_hash IS NOT NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-memory store for orchestrator tests; mirrors the conditional
    /// update semantics of `PgStore`.
    #[derive(Default)]
    pub struct MemoryStore {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl CredentialStore for MemoryStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.id == id).cloned())
        }

        async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == email) {
                return Err(StoreError::Duplicate);
            }
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_owned(),
                password_hash: password_hash.to_owned(),
                refresh_token_hash: None,
                created_at: OffsetDateTime::now_utc(),
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn store_refresh_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|u| u.id == id) {
                user.refresh_token_hash = Some(hash.to_owned());
            }
            Ok(())
        }

        async fn rotate_refresh_hash(
            &self,
            id: Uuid,
            expected: &str,
            new_hash: &str,
        ) -> Result<bool, StoreError> {
            let mut users = self.users.lock().unwrap();
            match users.iter_mut().find(|u| u.id == id) {
                Some(user) if user.refresh_token_hash.as_deref() == Some(expected) => {
                    user.refresh_token_hash = Some(new_hash.to_owned());
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn clear_refresh_hash(&self, id: Uuid) -> Result<(), StoreError> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|u| u.id == id) {
                user.refresh_token_hash = None;
            }
            Ok(())
        }
    }
}
