//! Integration tests for Comptoir.
//!
//! # Running Tests
//!
//! ```bash
//! # Store-level and HTTP tests need PostgreSQL (and the server for HTTP):
//! export STOREFRONT_DATABASE_URL=postgres://localhost/comptoir_test
//! cargo run -p comptoir-cli -- migrate
//! cargo run -p comptoir-storefront &
//! cargo test -p comptoir-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Service-level flows over the in-memory stores (always run)
//! - `repositories` - `PostgreSQL` repositories (ignored by default)
//! - `storefront_http` - HTTP against a running storefront (ignored by default)

#![cfg_attr(not(test), forbid(unsafe_code))]

use comptoir_storefront::db::{CatalogStore, PgStores};
use comptoir_storefront::models::{Category, Product, ProductDraft};
use rust_decimal::Decimal;
use secrecy::SecretString;

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// HTTP client with its own cookie jar that does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// An email address no other test run uses.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// A name no other test run uses.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix} {}", uuid::Uuid::new_v4().simple())
}

/// Stores over the test database, with migrations applied.
///
/// # Panics
///
/// Panics if `STOREFRONT_DATABASE_URL` is unset or the database is unreachable.
pub async fn pg_stores() -> PgStores {
    dotenvy::dotenv().ok();
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .map(SecretString::from)
        .expect("STOREFRONT_DATABASE_URL must be set for database tests");

    let pool = comptoir_storefront::db::create_pool(&url)
        .await
        .expect("Failed to connect to test database");
    comptoir_storefront::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    PgStores::new(pool)
}

/// Create a uniquely named category holding one product per `(name, price)`.
///
/// # Panics
///
/// Panics if the store rejects the fixtures.
pub async fn create_fixture_catalog<C: CatalogStore>(
    store: &C,
    products: &[(&str, i64)],
) -> (Category, Vec<Product>) {
    let category = store
        .create_category(&unique_name("Fixture"))
        .await
        .expect("Failed to create fixture category");

    let mut created = Vec::with_capacity(products.len());
    for (name, price) in products {
        let product = store
            .create_product(&ProductDraft {
                name: (*name).to_owned(),
                price_ht: Decimal::new(*price, 0),
                category_id: category.id,
            })
            .await
            .expect("Failed to create fixture product");
        created.push(product);
    }
    (category, created)
}
