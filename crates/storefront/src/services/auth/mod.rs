//! Authentication service.
//!
//! Email and password accounts, hashed with argon2.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use comptoir_core::{Email, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a, U> {
    users: &'a U,
}

impl<'a, U: UserStore> AuthService<'a, U> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a U) -> Self {
        Self { users }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.users
            .create(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the account no longer exists.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    #[tokio::test]
    async fn test_register_then_login() {
        let store = InMemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth.register("Ada@Example.com", "correct horse").await.unwrap();
        assert_eq!(user.email.as_str(), "ada@example.com");

        let logged_in = auth.login("ada@example.com", "correct horse").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let store = InMemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register("ada@example.com", "correct horse").await.unwrap();

        let err = auth.login("ada@example.com", "battery staple").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth.login("nobody@example.com", "correct horse").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = InMemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register("ada@example.com", "correct horse").await.unwrap();

        let err = auth.register("ADA@example.com", "another one").await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[test]
    fn test_short_password_is_weak() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }
}
