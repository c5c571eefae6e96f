//! Storage for the storefront.
//!
//! # Database: `comptoir` (schema `storefront`)
//!
//! ## Tables
//!
//! - `category`, `product` - The catalog
//! - `user` - Accounts (password login)
//! - `cart`, `cart_line` - Persisted carts of logged-in users
//! - `tower_sessions.session` - Session storage (guest carts live here)
//!
//! Every store is a trait with a `PostgreSQL` repository and an in-memory
//! implementation ([`memory::InMemoryStore`]). Services are generic over the
//! traits, so the same logic runs against either backend.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p comptoir-cli -- migrate
//! ```

pub mod carts;
pub mod catalog;
pub mod memory;
pub mod users;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

pub use carts::{CartRepository, CartStore};
pub use catalog::{CatalogRepository, CatalogStore};
pub use memory::InMemoryStore;
pub use users::{UserRepository, UserStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate category name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to `Conflict`.
    pub(crate) fn from_constraint(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// The set of stores the application runs against.
///
/// Implemented by [`PgStores`] in production and by [`InMemoryStore`] in tests.
pub trait Stores: Clone + Send + Sync + 'static {
    type Catalog: CatalogStore;
    type Carts: CartStore;
    type Users: UserStore;

    fn catalog(&self) -> &Self::Catalog;
    fn carts(&self) -> &Self::Carts;
    fn users(&self) -> &Self::Users;

    /// Whether the backing storage is reachable.
    fn ping(&self) -> impl Future<Output = bool> + Send;
}

/// `PostgreSQL`-backed stores sharing one connection pool.
#[derive(Clone)]
pub struct PgStores {
    pool: PgPool,
    catalog: CatalogRepository,
    carts: CartRepository,
    users: UserRepository,
}

impl PgStores {
    /// Create the repositories over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog: CatalogRepository::new(pool.clone()),
            carts: CartRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Stores for PgStores {
    type Catalog = CatalogRepository;
    type Carts = CartRepository;
    type Users = UserRepository;

    fn catalog(&self) -> &CatalogRepository {
        &self.catalog
    }

    fn carts(&self) -> &CartRepository {
        &self.carts
    }

    fn users(&self) -> &UserRepository {
        &self.users
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Errors from running migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("session store migration error: {0}")]
    SessionStore(#[from] sqlx::Error),
}

/// Apply the storefront schema migrations and the session table migration.
///
/// # Errors
///
/// Returns `MigrationError` if either migration set fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    PostgresStore::new(pool.clone()).migrate().await?;
    Ok(())
}
