//! Comptoir storefront library.
//!
//! Catalog browsing with category and price filters, a cart that lives in
//! the session for guests and in `PostgreSQL` for logged-in users, and
//! product administration. Split from the binary so the router can be
//! exercised in tests against the in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
