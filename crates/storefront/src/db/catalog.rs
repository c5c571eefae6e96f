//! Catalog repository: categories and products.

use std::future::Future;

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use comptoir_core::{CategoryId, ProductId};

use super::RepositoryError;
use crate::models::{Category, Product, ProductDraft, ProductFilter};

/// Storage for categories and products.
///
/// Listings are returned in store order: by category ID, then product ID.
pub trait CatalogStore: Send + Sync {
    fn list_categories(
        &self,
    ) -> impl Future<Output = Result<Vec<Category>, RepositoryError>> + Send;

    fn get_category(
        &self,
        id: CategoryId,
    ) -> impl Future<Output = Result<Option<Category>, RepositoryError>> + Send;

    /// Returns `RepositoryError::Conflict` if the name is taken.
    fn create_category(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Category, RepositoryError>> + Send;

    /// Returns `Ok(false)` if the category did not exist and
    /// `RepositoryError::Conflict` while products still reference it.
    fn delete_category(
        &self,
        id: CategoryId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Returns `RepositoryError::NotFound` if the draft's category is missing.
    fn create_product(
        &self,
        draft: &ProductDraft,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    /// Returns `RepositoryError::NotFound` if the product or the draft's
    /// category is missing.
    fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    /// Delete a product and every cart line referencing it, adjusting the
    /// cached totals of the affected carts. Returns `Ok(false)` if the
    /// product did not exist.
    fn delete_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

#[derive(FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price_ht: Decimal,
    category_id: i32,
    category_name: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price_ht: row.price_ht,
            category: Category {
                id: CategoryId::new(row.category_id),
                name: row.category_name,
            },
        }
    }
}

const PRODUCT_COLUMNS: &str = r"
    SELECT p.id, p.name, p.price_ht,
           c.id AS category_id, c.name AS category_name
    FROM storefront.product p
    JOIN storefront.category c ON c.id = p.category_id
";

/// `PostgreSQL` catalog repository.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CatalogStore for CatalogRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM storefront.category ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM storefront.category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO storefront.category (name)
            VALUES ($1)
            RETURNING id, name
            ",
        )
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category name already exists"))?;

        Ok(row.into())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.category WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_constraint(e, "category still has products")
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let category_ids: Vec<i32> = filter.category_ids.iter().map(CategoryId::as_i32).collect();
        let sql = format!(
            r"{PRODUCT_COLUMNS}
            WHERE (cardinality($1::int4[]) = 0 OR p.category_id = ANY($1))
              AND ($2::numeric IS NULL OR p.price_ht >= $2)
              AND ($3::numeric IS NULL OR p.price_ht <= $3)
            ORDER BY c.id, p.id
            "
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(category_ids)
            .bind(filter.price_min)
            .bind(filter.price_max)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_COLUMNS} WHERE p.id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO storefront.product (name, price_ht, category_id)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(draft.name.trim())
        .bind(draft.price_ht)
        .bind(draft.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match RepositoryError::from_constraint(e, "unknown category") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;

        self.get_product(ProductId::new(id))
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption(format!("product {id} vanished")))
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Open carts cache their total; move it by the price difference.
        sqlx::query(
            r"
            UPDATE storefront.cart c
            SET total = c.total + l.quantity * ($2 - p.price_ht)
            FROM storefront.cart_line l
            JOIN storefront.product p ON p.id = l.product_id
            WHERE l.cart_id = c.id AND l.product_id = $1 AND c.status = 'open'
            ",
        )
        .bind(id)
        .bind(draft.price_ht)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r"
            UPDATE storefront.product
            SET name = $2, price_ht = $3, category_id = $4
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(draft.name.trim())
        .bind(draft.price_ht)
        .bind(draft.category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match RepositoryError::from_constraint(e, "unknown category") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;

        self.get_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lines cascade with the product; take their value off open cart totals first.
        // Finalized carts keep the total they were validated with.
        sqlx::query(
            r"
            UPDATE storefront.cart c
            SET total = c.total - l.quantity * p.price_ht
            FROM storefront.cart_line l
            JOIN storefront.product p ON p.id = l.product_id
            WHERE l.cart_id = c.id AND l.product_id = $1 AND c.status = 'open'
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
