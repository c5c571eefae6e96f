//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{PgStores, Stores};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the stores and configuration. Generic over the store set so router tests
/// can run against [`crate::db::InMemoryStore`].
pub struct AppState<S = PgStores> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    config: StorefrontConfig,
    stores: S,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Stores> AppState<S> {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, stores: S) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, stores }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the stores.
    #[must_use]
    pub fn stores(&self) -> &S {
        &self.inner.stores
    }
}
