//! User repository for database operations.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use comptoir_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

/// Storage for user accounts.
pub trait UserStore: Send + Sync {
    /// Look a user up by email, returning the account and its password hash.
    fn find_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    fn get(&self, id: UserId)
    -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Returns `RepositoryError::Conflict` if the email is already registered.
    fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;
}

#[derive(FromRow)]
struct UserRow {
    id: i32,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<(User, String), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let user = User {
            id: UserId::new(self.id),
            email,
            created_at: self.created_at,
        };
        Ok((user, self.password_hash))
    }
}

/// `PostgreSQL` user repository.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserStore for UserRepository {
    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM storefront."user"
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM storefront."user"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user).transpose()?.map(|(user, _)| user))
    }

    async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO storefront."user" (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "email already exists"))?;

        row.into_user().map(|(user, _)| user)
    }
}
