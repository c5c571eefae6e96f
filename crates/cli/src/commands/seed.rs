//! Seed the catalog from a YAML file.
//!
//! # Usage
//!
//! ```bash
//! comptoir seed catalog.yaml
//! ```
//!
//! # File Format
//!
//! ```yaml
//! categories:
//!   - name: Tools
//!     products:
//!       - name: Hammer
//!         price_ht: "19.90"
//! ```
//!
//! Quote prices so they are read as exact decimals. Seeding is idempotent:
//! categories are matched by name and products by name within their
//! category, and existing entries are left untouched.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use comptoir_storefront::db::{CatalogRepository, CatalogStore};
use comptoir_storefront::models::{Category, ProductDraft};
use comptoir_storefront::services::{CatalogError, CatalogService};

use super::connect;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub price_ht: Decimal,
}

/// What a seeding run changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories_created: usize,
    pub products_created: usize,
    pub products_skipped: usize,
}

/// Seed the catalog from the YAML file at `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database is
/// unreachable, or an entry fails validation.
pub async fn run(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog seed");

    // Parse before connecting so a bad file fails fast
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(categories = seed.categories.len(), "Parsed seed file");

    let pool = connect().await?;
    let store = CatalogRepository::new(pool);
    let summary = seed_catalog(&store, &seed).await?;

    info!("Seeding complete!");
    info!("  Categories created: {}", summary.categories_created);
    info!("  Products created: {}", summary.products_created);
    info!("  Products skipped (already exist): {}", summary.products_skipped);
    Ok(())
}

/// Create the categories and products of `seed` that `store` lacks.
///
/// # Errors
///
/// Returns `CatalogError` if an entry is invalid or the store fails.
pub async fn seed_catalog<C: CatalogStore>(
    store: &C,
    seed: &SeedFile,
) -> Result<SeedSummary, CatalogError> {
    let catalog = CatalogService::new(store);
    let mut existing = catalog.list_categories().await?;
    let mut summary = SeedSummary::default();

    for entry in &seed.categories {
        let category = match find_category(&existing, &entry.name) {
            Some(category) => category.clone(),
            None => {
                let category = catalog.create_category(&entry.name).await?;
                summary.categories_created += 1;
                existing.push(category.clone());
                category
            }
        };

        let products = catalog.list_by_category(category.id).await?.products;
        for product in &entry.products {
            if products.iter().any(|p| p.name == product.name.trim()) {
                summary.products_skipped += 1;
                continue;
            }

            catalog
                .create_product(&ProductDraft {
                    name: product.name.trim().to_owned(),
                    price_ht: product.price_ht,
                    category_id: category.id,
                })
                .await?;
            summary.products_created += 1;
        }
    }

    Ok(summary)
}

fn find_category<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
    categories.iter().find(|c| c.name == name.trim())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use comptoir_storefront::db::InMemoryStore;
    use comptoir_storefront::models::ProductFilter;

    const SEED: &str = r#"
categories:
  - name: Tools
    products:
      - name: Hammer
        price_ht: "19.90"
      - name: Saw
        price_ht: "12"
  - name: Garden
"#;

    #[tokio::test]
    async fn test_seed_creates_catalog() {
        let store = InMemoryStore::new();
        let seed: SeedFile = serde_yaml::from_str(SEED).unwrap();

        let summary = seed_catalog(&store, &seed).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                categories_created: 2,
                products_created: 2,
                products_skipped: 0,
            }
        );

        let products = store.list_products(&ProductFilter::all()).await.unwrap();
        let hammer = products.iter().find(|p| p.name == "Hammer").unwrap();
        assert_eq!(hammer.price_ht, Decimal::new(1990, 2));
        assert_eq!(hammer.category.name, "Tools");
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = InMemoryStore::new();
        let seed: SeedFile = serde_yaml::from_str(SEED).unwrap();
        seed_catalog(&store, &seed).await.unwrap();

        let summary = seed_catalog(&store, &seed).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                categories_created: 0,
                products_created: 0,
                products_skipped: 2,
            }
        );
        assert_eq!(store.list_categories().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_rejects_negative_price() {
        let store = InMemoryStore::new();
        let seed: SeedFile = serde_yaml::from_str(
            "categories:\n  - name: Tools\n    products:\n      - name: Refund\n        price_ht: \"-1\"\n",
        )
        .unwrap();

        let err = seed_catalog(&store, &seed).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
