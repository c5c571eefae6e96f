//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database
//! row types (see `db`) and from template view types (see `routes`).

pub mod cart;
pub mod catalog;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartSummary, GuestCart};
pub use catalog::{Category, CategoryGroup, Product, ProductDraft, ProductFilter};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
