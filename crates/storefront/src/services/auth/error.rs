//! Errors from account registration and password login.
//!
//! There is a single credential kind (email and password), so failures are
//! either a rejected input, a bad login, or a storage/hashing fault.

use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The submitted address did not parse as an email.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] comptoir_core::EmailError),

    /// Unknown email, wrong password, or a session user that no longer
    /// exists. The caller cannot tell these apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Registration with an email that already has an account.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Password shorter than the minimum length.
    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("user store error: {0}")]
    Repository(#[from] RepositoryError),

    /// Argon2 could not hash or parse a stored hash.
    #[error("password hashing failed")]
    PasswordHash,
}
