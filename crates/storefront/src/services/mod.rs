//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email/password accounts
//! - `cart` - Guest and persisted carts behind one interface
//! - `catalog` - Browsing, filtering and product administration
//!
//! Services borrow their stores and are built per request, e.g.
//! `CartService::new(state.stores())`.

pub mod auth;
pub mod cart;
pub mod catalog;

pub use auth::{AuthError, AuthService};
pub use cart::{
    ActiveCart, CartBackend, CartContext, CartError, CartService, Identity, MemorySession,
    SessionContainer,
};
pub use catalog::{CatalogError, CatalogService, filter_from_query};
