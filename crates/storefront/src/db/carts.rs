//! Cart repository for persisted (logged-in) carts.
//!
//! The cached `cart.total` column is adjusted inside the same transaction as
//! every line mutation. No row locks are taken: two concurrent adds to the
//! same cart race the way any read-modify-write would.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use comptoir_core::{CartId, CartStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartItem, Product};

/// Storage for persisted carts and their lines.
pub trait CartStore: Send + Sync {
    /// The user's open cart, if any.
    fn find_open(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    fn find(&self, id: CartId)
    -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// The user's open cart, created empty if there is none.
    fn get_or_create_open(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Lines of a cart with current product names and prices, in insertion order.
    fn lines(
        &self,
        id: CartId,
    ) -> impl Future<Output = Result<Vec<CartItem>, RepositoryError>> + Send;

    /// Add one unit of `product` to the user's open cart, creating the cart
    /// if needed, and bump the cached total by the product's price.
    /// Cart creation and line upsert happen in one transaction.
    fn add_product(
        &self,
        user_id: UserId,
        product: &Product,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Delete the line for `product_id`. Returns whether a line existed.
    fn remove_line(
        &self,
        id: CartId,
        product_id: ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Set the quantity (> 0) of an existing line. Returns whether a line existed.
    fn set_line_quantity(
        &self,
        id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Flag the cart finalized and return the status it had before.
    ///
    /// Returns `RepositoryError::NotFound` if the cart does not exist.
    fn finalize(
        &self,
        id: CartId,
    ) -> impl Future<Output = Result<CartStatus, RepositoryError>> + Send;

    /// Delete the cart and all of its lines. Returns whether the cart existed.
    fn delete(&self, id: CartId) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

#[derive(FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    status: CartStatus,
    total: Decimal,
    created_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            status: row.status,
            total: row.total,
            created_at: row.created_at,
            finalized_at: row.finalized_at,
        }
    }
}

#[derive(FromRow)]
struct LineRow {
    product_id: i32,
    name: String,
    price_ht: Decimal,
    quantity: i32,
}

impl From<LineRow> for CartItem {
    fn from(row: LineRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price_ht: row.price_ht,
            quantity: row.quantity,
        }
    }
}

const CART_COLUMNS: &str = "id, user_id, status, total, created_at, finalized_at";

/// `PostgreSQL` cart repository.
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn open_cart_in(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
    ) -> Result<Cart, RepositoryError> {
        // The partial unique index keeps this to one open cart per user.
        sqlx::query(
            r"
            INSERT INTO storefront.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) WHERE status = 'open' DO NOTHING
            ",
        )
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        let sql = format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart WHERE user_id = $1 AND status = 'open'"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(row.into())
    }

    /// Quantity and unit price of a line, if present.
    async fn line_in(
        tx: &mut Transaction<'_, Postgres>,
        id: CartId,
        product_id: ProductId,
    ) -> Result<Option<(i32, Decimal)>, RepositoryError> {
        let row: Option<(i32, Decimal)> = sqlx::query_as(
            r"
            SELECT l.quantity, p.price_ht
            FROM storefront.cart_line l
            JOIN storefront.product p ON p.id = l.product_id
            WHERE l.cart_id = $1 AND l.product_id = $2
            ",
        )
        .bind(id)
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    async fn adjust_total_in(
        tx: &mut Transaction<'_, Postgres>,
        id: CartId,
        delta: Decimal,
    ) -> Result<Cart, RepositoryError> {
        let sql = format!(
            "UPDATE storefront.cart SET total = total + $2 WHERE id = $1 RETURNING {CART_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(id)
            .bind(delta)
            .fetch_one(&mut **tx)
            .await?;

        Ok(row.into())
    }
}

impl CartStore for CartRepository {
    async fn find_open(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart WHERE user_id = $1 AND status = 'open'"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Cart::from))
    }

    async fn find(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let sql = format!("SELECT {CART_COLUMNS} FROM storefront.cart WHERE id = $1");
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Cart::from))
    }

    async fn get_or_create_open(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let cart = Self::open_cart_in(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn lines(&self, id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, LineRow>(
            r"
            SELECT l.product_id, p.name, p.price_ht, l.quantity
            FROM storefront.cart_line l
            JOIN storefront.product p ON p.id = l.product_id
            WHERE l.cart_id = $1
            ORDER BY l.id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn add_product(&self, user_id: UserId, product: &Product) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let cart = Self::open_cart_in(&mut tx, user_id).await?;

        sqlx::query(
            r"
            INSERT INTO storefront.cart_line (cart_id, product_id, quantity)
            VALUES ($1, $2, 1)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = storefront.cart_line.quantity + 1
            ",
        )
        .bind(cart.id)
        .bind(product.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match RepositoryError::from_constraint(e, "unknown product") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;

        let cart = Self::adjust_total_in(&mut tx, cart.id, product.price_ht).await?;
        tx.commit().await?;

        Ok(cart)
    }

    async fn remove_line(&self, id: CartId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some((quantity, price_ht)) = Self::line_in(&mut tx, id, product_id).await? else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM storefront.cart_line WHERE cart_id = $1 AND product_id = $2")
            .bind(id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        Self::adjust_total_in(&mut tx, id, -(price_ht * Decimal::from(quantity))).await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn set_line_quantity(
        &self,
        id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some((previous, price_ht)) = Self::line_in(&mut tx, id, product_id).await? else {
            return Ok(false);
        };

        sqlx::query(
            r"
            UPDATE storefront.cart_line
            SET quantity = $3
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        let delta = price_ht * Decimal::from(i64::from(quantity) - i64::from(previous));
        Self::adjust_total_in(&mut tx, id, delta).await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn finalize(&self, id: CartId) -> Result<CartStatus, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous: CartStatus =
            sqlx::query_scalar("SELECT status FROM storefront.cart WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            r"
            UPDATE storefront.cart
            SET status = 'finalized', finalized_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(previous)
    }

    async fn delete(&self, id: CartId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.cart_line WHERE cart_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM storefront.cart WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
