//! In-memory implementation of every store.
//!
//! Mirrors the relational constraints of the `PostgreSQL` schema (unique
//! names, foreign keys, one open cart per user, cascades) so service and
//! router tests exercise the same rules without a database.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use comptoir_core::{CartId, CartStatus, CategoryId, Email, ProductId, UserId};

use super::{CartStore, CatalogStore, RepositoryError, Stores, UserStore};
use crate::models::{Cart, CartItem, Category, Product, ProductDraft, ProductFilter, User};

#[derive(Debug, Clone)]
struct StoredProduct {
    id: ProductId,
    name: String,
    price_ht: Decimal,
    category_id: CategoryId,
}

#[derive(Debug, Clone, Copy)]
struct StoredLine {
    cart_id: CartId,
    product_id: ProductId,
    quantity: i32,
}

#[derive(Debug, Default)]
struct MemoryDb {
    next_id: i32,
    categories: Vec<Category>,
    products: Vec<StoredProduct>,
    users: Vec<(User, String)>,
    carts: Vec<Cart>,
    lines: Vec<StoredLine>,
}

impl MemoryDb {
    const fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn product(&self, id: ProductId) -> Option<Product> {
        let stored = self.products.iter().find(|p| p.id == id)?;
        let category = self
            .categories
            .iter()
            .find(|c| c.id == stored.category_id)?
            .clone();

        Some(Product {
            id,
            name: stored.name.clone(),
            price_ht: stored.price_ht,
            category,
        })
    }

    fn price(&self, id: ProductId) -> Decimal {
        self.products
            .iter()
            .find(|p| p.id == id)
            .map_or(Decimal::ZERO, |p| p.price_ht)
    }

    fn cart_mut(&mut self, id: CartId) -> Option<&mut Cart> {
        self.carts.iter_mut().find(|c| c.id == id)
    }

    fn adjust_total(&mut self, id: CartId, delta: Decimal) {
        if let Some(cart) = self.cart_mut(id) {
            cart.total += delta;
        }
    }

    /// Move the cached totals of open carts holding `product_id` by
    /// `per_unit` times each line's quantity. Finalized carts keep theirs.
    fn reprice_open_carts(&mut self, product_id: ProductId, per_unit: Decimal) {
        let affected: Vec<StoredLine> = self
            .lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .copied()
            .collect();
        for line in affected {
            if let Some(cart) = self.cart_mut(line.cart_id).filter(|c| c.status.is_open()) {
                cart.total += per_unit * Decimal::from(line.quantity);
            }
        }
    }

    fn open_cart(&mut self, user_id: UserId) -> Cart {
        if let Some(cart) = self
            .carts
            .iter()
            .find(|c| c.user_id == user_id && c.status.is_open())
        {
            return cart.clone();
        }

        let cart = Cart {
            id: CartId::new(self.next_id()),
            user_id,
            status: CartStatus::Open,
            total: Decimal::ZERO,
            created_at: Utc::now(),
            finalized_at: None,
        };
        self.carts.push(cart.clone());
        cart
    }

    fn validate_draft_category(&self, draft: &ProductDraft) -> Result<(), RepositoryError> {
        if self.categories.iter().any(|c| c.id == draft.category_id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

/// Shared in-memory database implementing [`Stores`].
///
/// Cloning is cheap; clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    db: Arc<RwLock<MemoryDb>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of carts ever created and not deleted, in any status.
    pub async fn cart_count(&self) -> usize {
        self.db.read().await.carts.len()
    }
}

impl Stores for InMemoryStore {
    type Catalog = Self;
    type Carts = Self;
    type Users = Self;

    fn catalog(&self) -> &Self {
        self
    }

    fn carts(&self) -> &Self {
        self
    }

    fn users(&self) -> &Self {
        self
    }

    async fn ping(&self) -> bool {
        true
    }
}

impl CatalogStore for InMemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let db = self.db.read().await;
        let mut categories = db.categories.clone();
        categories.sort_by_key(|c| c.id);
        Ok(categories)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let db = self.db.read().await;
        Ok(db.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let mut db = self.db.write().await;
        let name = name.trim();
        if db.categories.iter().any(|c| c.name == name) {
            return Err(RepositoryError::Conflict(
                "category name already exists".to_owned(),
            ));
        }

        let category = Category {
            id: CategoryId::new(db.next_id()),
            name: name.to_owned(),
        };
        db.categories.push(category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let mut db = self.db.write().await;
        if db.products.iter().any(|p| p.category_id == id) {
            return Err(RepositoryError::Conflict(
                "category still has products".to_owned(),
            ));
        }

        let before = db.categories.len();
        db.categories.retain(|c| c.id != id);
        Ok(db.categories.len() != before)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let db = self.db.read().await;
        let mut products: Vec<Product> = db
            .products
            .iter()
            .filter_map(|p| db.product(p.id))
            .filter(|p| filter.matches(p))
            .collect();
        products.sort_by_key(|p| (p.category.id, p.id));
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.db.read().await.product(id))
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let mut db = self.db.write().await;
        db.validate_draft_category(draft)?;

        let id = ProductId::new(db.next_id());
        db.products.push(StoredProduct {
            id,
            name: draft.name.trim().to_owned(),
            price_ht: draft.price_ht,
            category_id: draft.category_id,
        });

        db.product(id)
            .ok_or_else(|| RepositoryError::DataCorruption(format!("product {id} vanished")))
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut db = self.db.write().await;
        db.validate_draft_category(draft)?;

        let old_price = db
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.price_ht)
            .ok_or(RepositoryError::NotFound)?;
        db.reprice_open_carts(id, draft.price_ht - old_price);

        let stored = db
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        draft.name.trim().clone_into(&mut stored.name);
        stored.price_ht = draft.price_ht;
        stored.category_id = draft.category_id;

        db.product(id).ok_or(RepositoryError::NotFound)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut db = self.db.write().await;
        if !db.products.iter().any(|p| p.id == id) {
            return Ok(false);
        }

        let price = db.price(id);
        db.reprice_open_carts(id, -price);

        db.lines.retain(|l| l.product_id != id);
        db.products.retain(|p| p.id != id);
        Ok(true)
    }
}

impl CartStore for InMemoryStore {
    async fn find_open(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let db = self.db.read().await;
        Ok(db
            .carts
            .iter()
            .find(|c| c.user_id == user_id && c.status.is_open())
            .cloned())
    }

    async fn find(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let db = self.db.read().await;
        Ok(db.carts.iter().find(|c| c.id == id).cloned())
    }

    async fn get_or_create_open(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        Ok(self.db.write().await.open_cart(user_id))
    }

    async fn lines(&self, id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let db = self.db.read().await;
        Ok(db
            .lines
            .iter()
            .filter(|l| l.cart_id == id)
            .filter_map(|l| {
                let product = db.product(l.product_id)?;
                Some(CartItem {
                    product_id: product.id,
                    name: product.name,
                    price_ht: product.price_ht,
                    quantity: l.quantity,
                })
            })
            .collect())
    }

    async fn add_product(&self, user_id: UserId, product: &Product) -> Result<Cart, RepositoryError> {
        let mut db = self.db.write().await;
        if !db.products.iter().any(|p| p.id == product.id) {
            return Err(RepositoryError::NotFound);
        }

        let cart = db.open_cart(user_id);
        match db
            .lines
            .iter_mut()
            .find(|l| l.cart_id == cart.id && l.product_id == product.id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => db.lines.push(StoredLine {
                cart_id: cart.id,
                product_id: product.id,
                quantity: 1,
            }),
        }

        db.adjust_total(cart.id, product.price_ht);
        db.carts
            .iter()
            .find(|c| c.id == cart.id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn remove_line(&self, id: CartId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let mut db = self.db.write().await;
        let Some(quantity) = db
            .lines
            .iter()
            .find(|l| l.cart_id == id && l.product_id == product_id)
            .map(|l| l.quantity)
        else {
            return Ok(false);
        };

        db.lines
            .retain(|l| !(l.cart_id == id && l.product_id == product_id));
        let price = db.price(product_id);
        db.adjust_total(id, -(price * Decimal::from(quantity)));
        Ok(true)
    }

    async fn set_line_quantity(
        &self,
        id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let mut db = self.db.write().await;
        let Some(line) = db
            .lines
            .iter_mut()
            .find(|l| l.cart_id == id && l.product_id == product_id)
        else {
            return Ok(false);
        };

        let previous = line.quantity;
        line.quantity = quantity;
        let price = db.price(product_id);
        db.adjust_total(
            id,
            price * Decimal::from(i64::from(quantity) - i64::from(previous)),
        );
        Ok(true)
    }

    async fn finalize(&self, id: CartId) -> Result<CartStatus, RepositoryError> {
        let mut db = self.db.write().await;
        let cart = db.cart_mut(id).ok_or(RepositoryError::NotFound)?;
        let previous = cart.status;
        cart.status = CartStatus::Finalized;
        cart.finalized_at = Some(Utc::now());
        Ok(previous)
    }

    async fn delete(&self, id: CartId) -> Result<bool, RepositoryError> {
        let mut db = self.db.write().await;
        db.lines.retain(|l| l.cart_id != id);
        let before = db.carts.len();
        db.carts.retain(|c| c.id != id);
        Ok(db.carts.len() != before)
    }
}

impl UserStore for InMemoryStore {
    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let db = self.db.read().await;
        Ok(db.users.iter().find(|(u, _)| &u.email == email).cloned())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let db = self.db.read().await;
        Ok(db
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let mut db = self.db.write().await;
        if db.users.iter().any(|(u, _)| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(db.next_id()),
            email: email.clone(),
            created_at: Utc::now(),
        };
        db.users.push((user.clone(), password_hash.to_owned()));
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn seeded() -> (InMemoryStore, Product, Product) {
        let store = InMemoryStore::new();
        let tools = store.create_category("Tools").await.unwrap();
        let hammer = store
            .create_product(&ProductDraft {
                name: "Hammer".to_owned(),
                price_ht: Decimal::new(20, 0),
                category_id: tools.id,
            })
            .await
            .unwrap();
        let saw = store
            .create_product(&ProductDraft {
                name: "Saw".to_owned(),
                price_ht: Decimal::new(5, 0),
                category_id: tools.id,
            })
            .await
            .unwrap();
        (store, hammer, saw)
    }

    #[tokio::test]
    async fn test_duplicate_category_name_conflicts() {
        let store = InMemoryStore::new();
        store.create_category("Tools").await.unwrap();
        let err = store.create_category(" Tools ").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_category_with_products_cannot_be_deleted() {
        let (store, hammer, _) = seeded().await;
        let err = store.delete_category(hammer.category.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_product_requires_existing_category() {
        let store = InMemoryStore::new();
        let err = store
            .create_product(&ProductDraft {
                name: "Orphan".to_owned(),
                price_ht: Decimal::ONE,
                category_id: CategoryId::new(42),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_add_product_keeps_one_open_cart() {
        let (store, hammer, saw) = seeded().await;
        let user = UserId::new(100);

        let first = store.add_product(user, &hammer).await.unwrap();
        let second = store.add_product(user, &saw).await.unwrap();
        let third = store.add_product(user, &hammer).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.id, third.id);
        assert_eq!(third.total, Decimal::new(45, 0));
        assert_eq!(store.cart_count().await, 1);

        let lines = store.lines(third.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_line_mutations_adjust_total() {
        let (store, hammer, saw) = seeded().await;
        let user = UserId::new(100);
        store.add_product(user, &hammer).await.unwrap();
        let cart = store.add_product(user, &saw).await.unwrap();

        assert!(store.set_line_quantity(cart.id, saw.id, 4).await.unwrap());
        assert!(store.remove_line(cart.id, hammer.id).await.unwrap());
        assert!(!store.remove_line(cart.id, hammer.id).await.unwrap());

        let cart = store.find(cart.id).await.unwrap().unwrap();
        assert_eq!(cart.total, Decimal::new(20, 0));
    }

    #[tokio::test]
    async fn test_deleting_product_cascades_lines() {
        let (store, hammer, saw) = seeded().await;
        let user = UserId::new(100);
        store.add_product(user, &hammer).await.unwrap();
        let cart = store.add_product(user, &saw).await.unwrap();

        assert!(store.delete_product(hammer.id).await.unwrap());

        let lines = store.lines(cart.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        let cart = store.find(cart.id).await.unwrap().unwrap();
        assert_eq!(cart.total, Decimal::new(5, 0));
    }

    #[tokio::test]
    async fn test_finalized_cart_is_no_longer_open() {
        let (store, hammer, _) = seeded().await;
        let user = UserId::new(100);
        let cart = store.add_product(user, &hammer).await.unwrap();

        assert_eq!(store.finalize(cart.id).await.unwrap(), CartStatus::Open);
        assert!(store.find_open(user).await.unwrap().is_none());

        let fresh = store.get_or_create_open(user).await.unwrap();
        assert_ne!(fresh.id, cart.id);
        assert_eq!(fresh.total, Decimal::ZERO);
    }
}
