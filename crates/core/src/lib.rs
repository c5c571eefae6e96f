//! Comptoir Core - Shared types library.
//!
//! This crate provides the types shared by every Comptoir component:
//! - `storefront` - Catalog, cart and product administration web app
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. The optional `postgres` feature adds `sqlx` encoding so the
//! same types can be bound directly in queries.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, emails and cart status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
