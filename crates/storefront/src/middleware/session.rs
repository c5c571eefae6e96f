//! Session middleware configuration.
//!
//! Production uses the `PostgreSQL` store from `tower-sessions-sqlx-store`;
//! tests pass a `MemoryStore`.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "comptoir_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over `store`.
///
/// Sessions expire after a week of inactivity. The cookie is `HttpOnly`,
/// `SameSite=Lax`, and `Secure` when the base URL is https.
#[must_use]
pub fn create_session_layer<T: SessionStore>(
    store: T,
    config: &StorefrontConfig,
) -> SessionManagerLayer<T> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
