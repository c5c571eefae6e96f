//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (store reachable)
//! GET  /                              - Redirect to /products
//!
//! # Catalog
//! GET  /products                      - Listing grouped by category (?categories=&priceMin=&priceMax=)
//! GET  /products/new                  - Product form (auth)
//! POST /products/new                  - Create product (auth)
//! GET  /products/{id}                 - Product detail
//! GET  /products/{id}/edit            - Edit form (auth)
//! POST /products/{id}/edit            - Update product (auth)
//! POST /products/{id}/delete          - Delete product (auth)
//! GET  /products/category/{id}        - Products of one category
//! POST /products/{id}/add-to-cart     - Add one unit to the cart
//! GET  /categories/new                - Category form (auth)
//! POST /categories/new                - Create category (auth)
//! POST /categories/{id}/delete        - Delete category (auth)
//!
//! # Cart
//! GET  /cart                          - Active cart
//! POST /cart/new                      - Open a persisted cart (auth)
//! POST /cart/remove/{product_id}      - Remove a line
//! POST /cart/update/{product_id}      - Set a line's quantity (form field `quantity`)
//! GET  /cart/count                    - Item count badge (fragment)
//! GET  /cart/{id}                     - Persisted cart detail (auth, owner)
//! POST /cart/{id}/validate            - Finalize (auth, owner)
//! POST /cart/{id}/delete              - Delete (auth, owner)
//!
//! # Auth
//! GET  /auth/login, POST /auth/login
//! GET  /auth/register, POST /auth/register
//! POST /auth/logout
//!
//! # Account
//! GET  /account                       - Account overview (auth)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod products;


use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Redirect,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{Session, SessionManagerLayer, SessionStore};

use crate::db::Stores;
use crate::middleware::{request_id_middleware, take_flash};
use crate::models::CurrentUser;
use crate::services::{CartContext, CartService};
use crate::state::AppState;

/// Data every full page needs for its header.
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub flash: Option<String>,
    pub cart_count: i64,
}

impl PageContext {
    /// Collect the header data, consuming any pending flash message.
    ///
    /// A failing cart lookup shows an empty badge rather than failing the page.
    pub async fn load<S: Stores>(
        state: &AppState<S>,
        session: &Session,
        user: Option<CurrentUser>,
    ) -> Self {
        let ctx = cart_context(user.as_ref(), session);
        let cart_count = match CartService::new(state.stores()).item_count(&ctx).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to count cart items");
                0
            }
        };

        Self {
            flash: take_flash(session).await,
            user,
            cart_count,
        }
    }
}

/// Cart context for the requester: the user's persisted cart when logged
/// in, otherwise the session's guest cart.
#[must_use]
pub fn cart_context<'a>(user: Option<&CurrentUser>, session: &'a Session) -> CartContext<'a, Session> {
    match user {
        Some(user) => CartContext::user(user.id, session),
        None => CartContext::guest(session),
    }
}

/// Create the product routes router.
pub fn product_routes<S: Stores>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(products::index::<S>))
        .route(
            "/new",
            get(products::new_page::<S>).post(products::create::<S>),
        )
        .route("/category/{id}", get(products::by_category::<S>))
        .route("/{id}", get(products::show::<S>))
        .route(
            "/{id}/edit",
            get(products::edit_page::<S>).post(products::update::<S>),
        )
        .route("/{id}/delete", post(products::delete::<S>))
        .route("/{id}/add-to-cart", post(cart::add::<S>))
}

/// Create the category routes router.
pub fn category_routes<S: Stores>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/new",
            get(categories::new_page::<S>).post(categories::create::<S>),
        )
        .route("/{id}/delete", post(categories::delete::<S>))
}

/// Create the cart routes router.
pub fn cart_routes<S: Stores>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(cart::index::<S>))
        .route("/new", post(cart::open::<S>))
        .route("/count", get(cart::count::<S>))
        .route("/remove/{product_id}", post(cart::remove::<S>))
        .route("/update/{product_id}", post(cart::update::<S>))
        .route("/{id}", get(cart::show::<S>))
        .route("/{id}/validate", post(cart::validate::<S>))
        .route("/{id}/delete", post(cart::delete::<S>))
}

/// Create the auth routes router.
pub fn auth_routes<S: Stores>() -> Router<AppState<S>> {
    Router::new()
        .route("/login", get(auth::login_page::<S>).post(auth::login::<S>))
        .route(
            "/register",
            get(auth::register_page::<S>).post(auth::register::<S>),
        )
        .route("/logout", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes<S: Stores>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/products") }))
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes())
        .route("/account", get(account::index::<S>))
}

/// The complete application: health checks, pages, sessions, request IDs
/// and request tracing.
pub fn app<S, T>(state: AppState<S>, session_layer: SessionManagerLayer<T>) -> Router
where
    S: Stores,
    T: SessionStore + Clone,
{
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .merge(routes())
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness<S: Stores>(State(state): State<AppState<S>>) -> StatusCode {
    if state.stores().ping().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
