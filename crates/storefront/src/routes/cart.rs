//! Cart route handlers.
//!
//! Visitors who are not logged in get a session cart; logged-in users work
//! on their persisted open cart. Add-to-cart answers HTMX requests with the
//! count badge fragment and everything else with a redirect.

use std::num::{IntErrorKind, ParseIntError};

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::{CartId, ProductId};

use super::{PageContext, cart_context};
use crate::db::Stores;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth, set_flash};
use crate::models::{Cart, CartSummary};
use crate::services::CartService;
use crate::state::AppState;

/// Quantity form data. Anything that is not an integer counts as zero;
/// integers too large for `i64` saturate.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityForm {
    #[serde(default)]
    pub quantity: String,
}

impl UpdateQuantityForm {
    fn quantity(&self) -> i64 {
        self.quantity
            .trim()
            .parse()
            .unwrap_or_else(|e: ParseIntError| match e.kind() {
                IntErrorKind::PosOverflow => i64::MAX,
                _ => 0,
            })
    }
}

/// Active cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/index.html")]
pub struct CartIndexTemplate {
    pub page: PageContext,
    pub cart: CartSummary,
}

/// Persisted cart detail template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: Cart,
    pub summary: CartSummary,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: i64,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("HX-Request")
}

/// Display the requester's active cart.
#[instrument(skip_all)]
pub async fn index<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let ctx = cart_context(user.as_ref(), &session);
    let cart = CartService::new(state.stores())
        .get_active_cart(&ctx)
        .await?;

    Ok(CartIndexTemplate {
        page: PageContext::load(&state, &session, user).await,
        cart,
    })
}

/// Add one unit of a product.
#[instrument(skip(state, session, user, headers))]
pub async fn add<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Path(product_id): Path<ProductId>,
) -> Result<Response> {
    let ctx = cart_context(user.as_ref(), &session);
    let service = CartService::new(state.stores());

    let product = service.add_item(&ctx, product_id).await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[("product_id", &product.id.to_string())],
    );

    if is_htmx(&headers) {
        let count = service.item_count(&ctx).await?;
        return Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate { count },
        )
            .into_response());
    }

    set_flash(&session, &format!("\"{}\" added to cart", product.name)).await;
    Ok(Redirect::to("/cart").into_response())
}

/// Remove a product's line. Missing lines are ignored.
#[instrument(skip(state, session, user))]
pub async fn remove<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Redirect> {
    let ctx = cart_context(user.as_ref(), &session);
    CartService::new(state.stores())
        .remove_item(&ctx, product_id)
        .await?;

    set_flash(&session, "Product removed from cart").await;
    Ok(Redirect::to("/cart"))
}

/// Set a line's quantity. Zero, negative or unparsable values remove it.
#[instrument(skip(state, session, user, form))]
pub async fn update<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
    Form(form): Form<UpdateQuantityForm>,
) -> Result<Redirect> {
    let ctx = cart_context(user.as_ref(), &session);
    CartService::new(state.stores())
        .update_quantity(&ctx, product_id, form.quantity())
        .await?;

    set_flash(&session, "Quantity updated").await;
    Ok(Redirect::to("/cart"))
}

/// Cart count badge (HTMX fragment).
pub async fn count<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let ctx = cart_context(user.as_ref(), &session);
    let count = CartService::new(state.stores()).item_count(&ctx).await?;
    Ok(CartCountTemplate { count })
}

/// Open a persisted cart for the user, reusing the open one if any.
#[instrument(skip_all)]
pub async fn open<S: Stores>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    let cart = CartService::new(state.stores()).open_cart(user.id).await?;
    Ok(Redirect::to(&format!("/cart/{}", cart.id)))
}

/// Display one of the user's persisted carts.
#[instrument(skip(state, session, user))]
pub async fn show<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartId>,
) -> Result<impl IntoResponse> {
    let (cart, summary) = CartService::new(state.stores())
        .show_cart(user.id, id)
        .await?;

    Ok(CartShowTemplate {
        page: PageContext::load(&state, &session, Some(user)).await,
        cart,
        summary,
    })
}

/// Finalize one of the user's carts.
#[instrument(skip(state, session, user))]
pub async fn validate<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartId>,
) -> Result<Redirect> {
    CartService::new(state.stores())
        .finalize_cart(user.id, id)
        .await?;

    add_breadcrumb("cart", "Cart finalized", &[("cart_id", &id.to_string())]);
    set_flash(&session, "Cart validated").await;
    Ok(Redirect::to(&format!("/cart/{id}")))
}

/// Delete one of the user's carts.
#[instrument(skip(state, session, user))]
pub async fn delete<S: Stores>(
    State(state): State<AppState<S>>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartId>,
) -> Result<Redirect> {
    CartService::new(state.stores())
        .delete_cart(user.id, id)
        .await?;

    set_flash(&session, "Cart deleted").await;
    Ok(Redirect::to("/cart"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(quantity: &str) -> UpdateQuantityForm {
        UpdateQuantityForm {
            quantity: quantity.to_owned(),
        }
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(form(" 3 ").quantity(), 3);
        assert_eq!(form("-2").quantity(), -2);
        assert_eq!(form("").quantity(), 0);
        assert_eq!(form("1.5").quantity(), 0);
        assert_eq!(form("lots").quantity(), 0);
    }

    #[test]
    fn test_oversized_quantity_saturates() {
        assert_eq!(form("99999999999999999999").quantity(), i64::MAX);
        assert_eq!(form("-99999999999999999999").quantity(), 0);
    }
}
