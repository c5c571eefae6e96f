//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID
//! 4. Session layer (tower-sessions)
//!
//! Authentication is done per handler with the [`RequireAuth`] and
//! [`OptionalAuth`] extractors.

pub mod auth;
pub mod flash;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use flash::{set_flash, take_flash};
pub use request_id::request_id_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
