//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! comptoir migrate
//! ```
//!
//! Applies `crates/storefront/migrations/` and creates the session table used
//! by `tower-sessions-sqlx-store`.

use comptoir_storefront::db::run_migrations;

use super::connect;

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    run_migrations(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
