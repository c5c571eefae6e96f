//! Cart operations for guests and logged-in users.
//!
//! A guest's cart lives in the session ([`EphemeralCart`]); a logged-in
//! user's cart is a persisted record ([`PersistedCart`]). [`CartService`]
//! picks one from the request's [`CartContext`] and otherwise only talks to
//! the [`CartBackend`] capability.

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use comptoir_core::{CartId, CartStatus, ProductId, UserId};

use crate::db::{CartStore, CatalogStore, RepositoryError, Stores};
use crate::models::{Cart, CartItem, CartSummary, GuestCart, Product, session_keys};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Unknown product, or a cart that does not exist or is not the requester's.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Repository(RepositoryError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Guest,
    User(UserId),
}

/// Where a guest cart is kept between requests.
pub trait SessionContainer: Send + Sync {
    /// The stored guest cart, or an empty one.
    fn load_guest_cart(&self) -> impl Future<Output = Result<GuestCart, CartError>> + Send;

    fn store_guest_cart(
        &self,
        cart: &GuestCart,
    ) -> impl Future<Output = Result<(), CartError>> + Send;

    fn clear_guest_cart(&self) -> impl Future<Output = Result<(), CartError>> + Send;
}

impl SessionContainer for Session {
    async fn load_guest_cart(&self) -> Result<GuestCart, CartError> {
        Ok(self
            .get::<GuestCart>(session_keys::GUEST_CART)
            .await?
            .unwrap_or_default())
    }

    async fn store_guest_cart(&self, cart: &GuestCart) -> Result<(), CartError> {
        self.insert(session_keys::GUEST_CART, cart).await?;
        Ok(())
    }

    async fn clear_guest_cart(&self) -> Result<(), CartError> {
        self.remove::<GuestCart>(session_keys::GUEST_CART).await?;
        Ok(())
    }
}

/// Session container held in memory, for tests and tooling.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    cart: Arc<Mutex<Option<GuestCart>>>,
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a guest cart has been stored.
    pub async fn has_guest_cart(&self) -> bool {
        self.cart.lock().await.is_some()
    }
}

impl SessionContainer for MemorySession {
    async fn load_guest_cart(&self) -> Result<GuestCart, CartError> {
        Ok(self.cart.lock().await.clone().unwrap_or_default())
    }

    async fn store_guest_cart(&self, cart: &GuestCart) -> Result<(), CartError> {
        *self.cart.lock().await = Some(cart.clone());
        Ok(())
    }

    async fn clear_guest_cart(&self) -> Result<(), CartError> {
        *self.cart.lock().await = None;
        Ok(())
    }
}

/// Identity and session of the current request.
pub struct CartContext<'a, K> {
    pub identity: Identity,
    pub session: &'a K,
}

impl<'a, K: SessionContainer> CartContext<'a, K> {
    #[must_use]
    pub const fn guest(session: &'a K) -> Self {
        Self {
            identity: Identity::Guest,
            session,
        }
    }

    #[must_use]
    pub const fn user(user_id: UserId, session: &'a K) -> Self {
        Self {
            identity: Identity::User(user_id),
            session,
        }
    }
}

/// Line-level operations shared by both cart representations.
pub trait CartBackend {
    fn lines(&self) -> impl Future<Output = Result<Vec<CartItem>, CartError>> + Send;

    /// Add one unit of `product`, creating the line (and cart) if needed.
    fn add_line(&self, product: &Product) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Returns whether a line was removed.
    fn remove_line(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<bool, CartError>> + Send;

    /// Set an existing line's quantity; zero or less removes it.
    /// Returns whether a line changed.
    fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<bool, CartError>> + Send;

    /// The stored total: summed snapshots for a guest cart, the cached
    /// running total for a persisted one.
    fn total(&self) -> impl Future<Output = Result<Decimal, CartError>> + Send;
}

/// Guest cart kept in the session.
pub struct EphemeralCart<'a, K> {
    session: &'a K,
}

impl<K: SessionContainer> CartBackend for EphemeralCart<'_, K> {
    async fn lines(&self) -> Result<Vec<CartItem>, CartError> {
        Ok(self.session.load_guest_cart().await?.lines().to_vec())
    }

    async fn add_line(&self, product: &Product) -> Result<(), CartError> {
        let mut cart = self.session.load_guest_cart().await?;
        cart.add(product);
        self.session.store_guest_cart(&cart).await
    }

    async fn remove_line(&self, product_id: ProductId) -> Result<bool, CartError> {
        let mut cart = self.session.load_guest_cart().await?;
        let removed = cart.remove(product_id);
        if removed {
            self.session.store_guest_cart(&cart).await?;
        }
        Ok(removed)
    }

    async fn set_quantity(&self, product_id: ProductId, quantity: i32) -> Result<bool, CartError> {
        let mut cart = self.session.load_guest_cart().await?;
        let changed = cart.set_quantity(product_id, quantity);
        if changed {
            self.session.store_guest_cart(&cart).await?;
        }
        Ok(changed)
    }

    async fn total(&self) -> Result<Decimal, CartError> {
        Ok(self.session.load_guest_cart().await?.total())
    }
}

/// A logged-in user's open cart in the cart store.
pub struct PersistedCart<'a, C> {
    store: &'a C,
    user_id: UserId,
}

impl<C: CartStore> CartBackend for PersistedCart<'_, C> {
    async fn lines(&self) -> Result<Vec<CartItem>, CartError> {
        match self.store.find_open(self.user_id).await? {
            Some(cart) => Ok(self.store.lines(cart.id).await?),
            None => Ok(Vec::new()),
        }
    }

    async fn add_line(&self, product: &Product) -> Result<(), CartError> {
        let cart = self.store.add_product(self.user_id, product).await?;
        info!(cart_id = %cart.id, product_id = %product.id, "Product added to cart");
        Ok(())
    }

    async fn remove_line(&self, product_id: ProductId) -> Result<bool, CartError> {
        let Some(cart) = self.store.find_open(self.user_id).await? else {
            return Ok(false);
        };
        Ok(self.store.remove_line(cart.id, product_id).await?)
    }

    async fn set_quantity(&self, product_id: ProductId, quantity: i32) -> Result<bool, CartError> {
        if quantity <= 0 {
            return self.remove_line(product_id).await;
        }
        let Some(cart) = self.store.find_open(self.user_id).await? else {
            return Ok(false);
        };
        Ok(self
            .store
            .set_line_quantity(cart.id, product_id, quantity)
            .await?)
    }

    async fn total(&self) -> Result<Decimal, CartError> {
        Ok(self
            .store
            .find_open(self.user_id)
            .await?
            .map_or(Decimal::ZERO, |cart| cart.total))
    }
}

/// The backend selected for a request.
pub enum ActiveCart<'a, C, K> {
    Ephemeral(EphemeralCart<'a, K>),
    Persisted(PersistedCart<'a, C>),
}

impl<C: CartStore, K: SessionContainer> CartBackend for ActiveCart<'_, C, K> {
    async fn lines(&self) -> Result<Vec<CartItem>, CartError> {
        match self {
            Self::Ephemeral(cart) => cart.lines().await,
            Self::Persisted(cart) => cart.lines().await,
        }
    }

    async fn add_line(&self, product: &Product) -> Result<(), CartError> {
        match self {
            Self::Ephemeral(cart) => cart.add_line(product).await,
            Self::Persisted(cart) => cart.add_line(product).await,
        }
    }

    async fn remove_line(&self, product_id: ProductId) -> Result<bool, CartError> {
        match self {
            Self::Ephemeral(cart) => cart.remove_line(product_id).await,
            Self::Persisted(cart) => cart.remove_line(product_id).await,
        }
    }

    async fn set_quantity(&self, product_id: ProductId, quantity: i32) -> Result<bool, CartError> {
        match self {
            Self::Ephemeral(cart) => cart.set_quantity(product_id, quantity).await,
            Self::Persisted(cart) => cart.set_quantity(product_id, quantity).await,
        }
    }

    async fn total(&self) -> Result<Decimal, CartError> {
        match self {
            Self::Ephemeral(cart) => cart.total().await,
            Self::Persisted(cart) => cart.total().await,
        }
    }
}

/// Cart service over a set of stores.
pub struct CartService<'a, S> {
    stores: &'a S,
}

impl<'a, S: Stores> CartService<'a, S> {
    #[must_use]
    pub const fn new(stores: &'a S) -> Self {
        Self { stores }
    }

    /// The backend for the requester: session for guests, store for users.
    #[must_use]
    pub fn backend<'c, K: SessionContainer>(
        &self,
        ctx: &CartContext<'c, K>,
    ) -> ActiveCart<'c, S::Carts, K>
    where
        'a: 'c,
    {
        match ctx.identity {
            Identity::Guest => ActiveCart::Ephemeral(EphemeralCart {
                session: ctx.session,
            }),
            Identity::User(user_id) => ActiveCart::Persisted(PersistedCart {
                store: self.stores.carts(),
                user_id,
            }),
        }
    }

    /// The requester's cart. Absence of a cart reads as an empty one.
    ///
    /// The total is summed over the lines at current prices (guest lines
    /// carry their add-time snapshot).
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store or session fails.
    #[instrument(skip(self, ctx), fields(identity = ?ctx.identity))]
    pub async fn get_active_cart<K: SessionContainer>(
        &self,
        ctx: &CartContext<'_, K>,
    ) -> Result<CartSummary, CartError> {
        match ctx.identity {
            Identity::Guest => {
                let items = self.backend(ctx).lines().await?;
                Ok(CartSummary::from_items(None, items))
            }
            Identity::User(user_id) => {
                let carts = self.stores.carts();
                match carts.find_open(user_id).await? {
                    Some(cart) => {
                        let items = carts.lines(cart.id).await?;
                        Ok(CartSummary::from_items(Some(cart.id), items))
                    }
                    None => Ok(CartSummary::empty()),
                }
            }
        }
    }

    /// Add one unit of a product to the requester's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the product does not exist.
    #[instrument(skip(self, ctx), fields(identity = ?ctx.identity))]
    pub async fn add_item<K: SessionContainer>(
        &self,
        ctx: &CartContext<'_, K>,
        product_id: ProductId,
    ) -> Result<Product, CartError> {
        let product = self
            .stores
            .catalog()
            .get_product(product_id)
            .await?
            .ok_or(CartError::NotFound)?;

        self.backend(ctx).add_line(&product).await?;
        Ok(product)
    }

    /// Remove a product's line. Returns whether there was one.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store or session fails.
    #[instrument(skip(self, ctx), fields(identity = ?ctx.identity))]
    pub async fn remove_item<K: SessionContainer>(
        &self,
        ctx: &CartContext<'_, K>,
        product_id: ProductId,
    ) -> Result<bool, CartError> {
        self.backend(ctx).remove_line(product_id).await
    }

    /// Set a line's quantity; zero or less removes the line. Quantities
    /// beyond `i32::MAX` are clamped. Returns whether a line changed.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store or session fails.
    #[instrument(skip(self, ctx), fields(identity = ?ctx.identity))]
    pub async fn update_quantity<K: SessionContainer>(
        &self,
        ctx: &CartContext<'_, K>,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<bool, CartError> {
        let backend = self.backend(ctx);
        if quantity <= 0 {
            return backend.remove_line(product_id).await;
        }
        let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
        backend.set_quantity(product_id, quantity).await
    }

    /// Number of units in the requester's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the store or session fails.
    pub async fn item_count<K: SessionContainer>(
        &self,
        ctx: &CartContext<'_, K>,
    ) -> Result<i64, CartError> {
        let lines = self.backend(ctx).lines().await?;
        Ok(lines.iter().map(|line| i64::from(line.quantity)).sum())
    }

    /// The user's open cart, created empty if there is none.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn open_cart(&self, user_id: UserId) -> Result<Cart, CartError> {
        Ok(self.stores.carts().get_or_create_open(user_id).await?)
    }

    /// A persisted cart of `owner` with its lines. A finalized cart shows
    /// the total it was validated with.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the cart does not exist or belongs
    /// to someone else.
    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn show_cart(
        &self,
        owner: UserId,
        cart_id: CartId,
    ) -> Result<(Cart, CartSummary), CartError> {
        let cart = self.owned_cart(owner, cart_id).await?;
        let items = self.stores.carts().lines(cart.id).await?;
        let mut summary = CartSummary::from_items(Some(cart.id), items);
        if !cart.status.is_open() {
            summary.total = cart.total;
        }
        Ok((cart, summary))
    }

    /// Flag a cart finalized. Finalizing twice is accepted and logged.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the cart does not exist or belongs
    /// to someone else.
    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn finalize_cart(&self, owner: UserId, cart_id: CartId) -> Result<(), CartError> {
        self.owned_cart(owner, cart_id).await?;

        let previous = self.stores.carts().finalize(cart_id).await?;
        if previous == CartStatus::Finalized {
            warn!("Cart was already finalized");
        } else {
            info!("Cart finalized");
        }
        Ok(())
    }

    /// Delete a cart and its lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the cart does not exist or belongs
    /// to someone else.
    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn delete_cart(&self, owner: UserId, cart_id: CartId) -> Result<(), CartError> {
        self.owned_cart(owner, cart_id).await?;

        if self.stores.carts().delete(cart_id).await? {
            info!("Cart deleted");
        }
        Ok(())
    }

    async fn owned_cart(&self, owner: UserId, cart_id: CartId) -> Result<Cart, CartError> {
        self.stores
            .carts()
            .find(cart_id)
            .await?
            .filter(|cart| cart.user_id == owner)
            .ok_or(CartError::NotFound)
    }
}
