//! Catalog browsing and administration.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use comptoir_core::{CategoryId, ProductId};

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, CategoryGroup, Product, ProductDraft, ProductFilter};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found")]
    NotFound,

    /// Input rejected before reaching the store.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Repository(other),
        }
    }
}

/// Catalog service over any [`CatalogStore`].
pub struct CatalogService<'a, C> {
    store: &'a C,
}

impl<'a, C: CatalogStore> CatalogService<'a, C> {
    #[must_use]
    pub const fn new(store: &'a C) -> Self {
        Self { store }
    }

    /// Products passing `filter`, partitioned by category in store order.
    ///
    /// Categories without a matching product are omitted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_grouped_by_category(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<CategoryGroup>, CatalogError> {
        let products = self.store.list_products(filter).await?;
        Ok(group_by_category(products))
    }

    /// A category with all of its products, ignoring price bounds.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn list_by_category(&self, id: CategoryId) -> Result<CategoryGroup, CatalogError> {
        let category = self
            .store
            .get_category(id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        let filter = ProductFilter {
            category_ids: vec![id],
            ..ProductFilter::all()
        };
        let products = self.store.list_products(&filter).await?;

        Ok(CategoryGroup { category, products })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a blank name, a negative price
    /// or an unknown category.
    #[instrument(skip(self), fields(name = %draft.name))]
    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product, CatalogError> {
        self.check_draft(draft).await?;

        let product = self
            .store
            .create_product(draft)
            .await
            .map_err(draft_error)?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist and
    /// `CatalogError::Validation` if the draft is invalid.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, CatalogError> {
        if self.store.get_product(id).await?.is_none() {
            return Err(CatalogError::NotFound);
        }
        self.check_draft(draft).await?;

        let product = self
            .store
            .update_product(id, draft)
            .await
            .map_err(draft_error)?;
        info!("Product updated");
        Ok(product)
    }

    /// Delete a product together with the cart lines referencing it.
    /// Deleting a missing product does nothing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.store.delete_product(id).await? {
            info!("Product deleted");
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a blank name and
    /// `CatalogError::Conflict` if the name is taken.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("category name is required".to_owned()));
        }

        let category = self.store.create_category(name).await?;
        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist and
    /// `CatalogError::Conflict` while products still reference it.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        if self.store.delete_category(id).await? {
            info!("Category deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }

    async fn check_draft(&self, draft: &ProductDraft) -> Result<(), CatalogError> {
        draft.validate().map_err(CatalogError::Validation)?;
        if self.store.get_category(draft.category_id).await?.is_none() {
            return Err(CatalogError::Validation("unknown category".to_owned()));
        }
        Ok(())
    }
}

/// A category that vanished between the check and the write is still a
/// form error, not a missing page.
fn draft_error(err: RepositoryError) -> CatalogError {
    match err {
        RepositoryError::NotFound => CatalogError::Validation("unknown category".to_owned()),
        other => other.into(),
    }
}

/// Split products (already in store order) into consecutive category groups.
#[must_use]
pub fn group_by_category(products: Vec<Product>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for product in products {
        match groups.last_mut() {
            Some(group) if group.category.id == product.category.id => {
                group.products.push(product);
            }
            _ => groups.push(CategoryGroup {
                category: product.category.clone(),
                products: vec![product],
            }),
        }
    }
    groups
}

/// Build a filter from a raw catalog query string.
///
/// `categories` may repeat and is also accepted as `categories[]`.
/// Unparseable category ids are skipped and an unparseable `priceMin` or
/// `priceMax` leaves that side unbounded.
#[must_use]
pub fn filter_from_query(query: Option<&str>) -> ProductFilter {
    let mut filter = ProductFilter::all();
    let Some(query) = query else {
        return filter;
    };

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "categories" | "categories[]" => {
                if let Ok(id) = value.parse::<CategoryId>()
                    && !filter.category_ids.contains(&id)
                {
                    filter.category_ids.push(id);
                }
            }
            "priceMin" => filter.price_min = parse_bound(&value),
            "priceMax" => filter.price_max = parse_bound(&value),
            _ => {}
        }
    }
    filter
}

fn parse_bound(value: &str) -> Option<Decimal> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Decimal::from_str(value).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    struct Fixture {
        store: InMemoryStore,
        cat_a: Category,
        cat_b: Category,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let cat_a = store.create_category("Alpha").await.unwrap();
        let cat_b = store.create_category("Beta").await.unwrap();
        for (name, price, category) in [
            ("Cheap A", 5, cat_a.id),
            ("Mid A", 10, cat_a.id),
            ("Top A", 50, cat_a.id),
            ("Lux A", 51, cat_a.id),
            ("Mid B", 20, cat_b.id),
        ] {
            store
                .create_product(&ProductDraft {
                    name: name.to_owned(),
                    price_ht: Decimal::new(price, 0),
                    category_id: category,
                })
                .await
                .unwrap();
        }
        Fixture {
            store,
            cat_a,
            cat_b,
        }
    }

    #[tokio::test]
    async fn test_unfiltered_listing_groups_every_product_once() {
        let f = fixture().await;
        let service = CatalogService::new(&f.store);

        let groups = service
            .list_grouped_by_category(&ProductFilter::all())
            .await
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, f.cat_a);
        assert_eq!(groups[1].category, f.cat_b);
        let total: usize = groups.iter().map(|g| g.products.len()).sum();
        assert_eq!(total, 5);
        for group in &groups {
            assert!(group.products.iter().all(|p| p.category == group.category));
        }
    }

    #[tokio::test]
    async fn test_category_and_price_filter() {
        let f = fixture().await;
        let service = CatalogService::new(&f.store);
        let filter = ProductFilter {
            category_ids: vec![f.cat_a.id],
            price_min: Some(Decimal::new(10, 0)),
            price_max: Some(Decimal::new(50, 0)),
        };

        let groups = service.list_grouped_by_category(&filter).await.unwrap();

        assert_eq!(groups.len(), 1);
        let names: Vec<&str> = groups[0].products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Mid A", "Top A"]);
    }

    #[tokio::test]
    async fn test_list_by_category_ignores_price_and_checks_existence() {
        let f = fixture().await;
        let service = CatalogService::new(&f.store);

        let group = service.list_by_category(f.cat_a.id).await.unwrap();
        assert_eq!(group.products.len(), 4);

        let err = service.list_by_category(CategoryId::new(999)).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound));
    }

    #[tokio::test]
    async fn test_product_draft_rules() {
        let f = fixture().await;
        let service = CatalogService::new(&f.store);

        let unknown = ProductDraft {
            name: "Ghost".to_owned(),
            price_ht: Decimal::ONE,
            category_id: CategoryId::new(999),
        };
        assert!(matches!(
            service.create_product(&unknown).await,
            Err(CatalogError::Validation(_))
        ));

        let negative = ProductDraft {
            name: "Debt".to_owned(),
            price_ht: Decimal::new(-1, 0),
            category_id: f.cat_b.id,
        };
        assert!(matches!(
            service.create_product(&negative).await,
            Err(CatalogError::Validation(_))
        ));

        let fractional = ProductDraft {
            name: "Screw".to_owned(),
            price_ht: Decimal::new(1999, 3),
            category_id: f.cat_b.id,
        };
        assert!(matches!(
            service.create_product(&fractional).await,
            Err(CatalogError::Validation(_))
        ));

        let missing = service
            .update_product(ProductId::new(999), &ProductDraft {
                name: "Nope".to_owned(),
                price_ht: Decimal::ONE,
                category_id: f.cat_b.id,
            })
            .await;
        assert!(matches!(missing, Err(CatalogError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_moves_product_between_categories() {
        let f = fixture().await;
        let service = CatalogService::new(&f.store);
        let product = service
            .list_by_category(f.cat_b.id)
            .await
            .unwrap()
            .products
            .remove(0);

        let updated = service
            .update_product(product.id, &ProductDraft {
                name: "Moved".to_owned(),
                price_ht: Decimal::new(7, 0),
                category_id: f.cat_a.id,
            })
            .await
            .unwrap();

        assert_eq!(updated.category, f.cat_a);
        assert!(service.list_by_category(f.cat_b.id).await.unwrap().products.is_empty());
    }

    #[tokio::test]
    async fn test_category_administration() {
        let f = fixture().await;
        let service = CatalogService::new(&f.store);

        assert!(matches!(
            service.create_category("Alpha").await,
            Err(CatalogError::Conflict(_))
        ));
        assert!(matches!(
            service.create_category("  ").await,
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            service.delete_category(f.cat_a.id).await,
            Err(CatalogError::Conflict(_))
        ));

        let empty = service.create_category("Gamma").await.unwrap();
        service.delete_category(empty.id).await.unwrap();
        assert!(matches!(
            service.delete_category(empty.id).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_deleting_missing_product_is_noop() {
        let f = fixture().await;
        let service = CatalogService::new(&f.store);
        service.delete_product(ProductId::new(999)).await.unwrap();
    }

    #[test]
    fn test_filter_from_query() {
        let filter =
            filter_from_query(Some("categories=1&categories%5B%5D=2&priceMin=10&priceMax=50.5"));
        assert_eq!(filter.category_ids, [CategoryId::new(1), CategoryId::new(2)]);
        assert_eq!(filter.price_min, Some(Decimal::new(10, 0)));
        assert_eq!(filter.price_max, Some(Decimal::new(505, 1)));
    }

    #[test]
    fn test_filter_from_query_ignores_garbage() {
        let filter = filter_from_query(Some("categories=abc&priceMin=cheap&priceMax="));
        assert_eq!(filter, ProductFilter::all());
        assert_eq!(filter_from_query(None), ProductFilter::all());
    }
}
