//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! COMPTOIR_USER_PASSWORD='...' comptoir user create -e owner@example.com
//! ```
//!
//! The password is read from `COMPTOIR_USER_PASSWORD` so it stays out of the
//! shell history.

use comptoir_storefront::db::UserRepository;
use comptoir_storefront::services::AuthService;
use secrecy::{ExposeSecret, SecretString};

use super::{CommandError, connect};

/// Environment variable holding the new account's password.
pub const PASSWORD_ENV: &str = "COMPTOIR_USER_PASSWORD";

/// Create a storefront account.
///
/// # Errors
///
/// Returns an error if the password variable is unset, the email or
/// password is rejected, or the account already exists.
pub async fn create(email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    let password = std::env::var(PASSWORD_ENV)
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar(PASSWORD_ENV))?;

    let users = UserRepository::new(pool);
    let user = AuthService::new(&users)
        .register(email, password.expose_secret())
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "User created");
    Ok(())
}
