//! Cart flows across the catalog and cart services, over the in-memory
//! stores and session.

#![allow(clippy::unwrap_used)]

use comptoir_core::UserId;
use comptoir_integration_tests::create_fixture_catalog;
use comptoir_storefront::db::{CatalogStore, InMemoryStore};
use comptoir_storefront::models::ProductDraft;
use comptoir_storefront::services::{CartContext, CartService, CatalogService, MemorySession};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_guest_and_user_carts_are_independent() {
    let store = InMemoryStore::new();
    let (_, products) = create_fixture_catalog(&store, &[("Hammer", 20), ("Saw", 5)]).await;
    let (hammer, saw) = (&products[0], &products[1]);
    let carts = CartService::new(&store);

    let guest_session = MemorySession::new();
    let guest = CartContext::guest(&guest_session);
    carts.add_item(&guest, hammer.id).await.unwrap();

    let user_session = MemorySession::new();
    let user = CartContext::user(UserId::new(7), &user_session);
    carts.add_item(&user, saw.id).await.unwrap();
    carts.add_item(&user, saw.id).await.unwrap();

    let guest_cart = carts.get_active_cart(&guest).await.unwrap();
    assert_eq!(guest_cart.total, Decimal::new(20, 0));
    assert!(guest_cart.cart_id.is_none());

    let user_cart = carts.get_active_cart(&user).await.unwrap();
    assert_eq!(user_cart.total, Decimal::new(10, 0));
    assert!(user_cart.cart_id.is_some());
    assert!(!user_session.has_guest_cart().await);
}

#[tokio::test]
async fn test_deleting_product_updates_user_cart() {
    let store = InMemoryStore::new();
    let (_, products) = create_fixture_catalog(&store, &[("Hammer", 20), ("Saw", 5)]).await;
    let carts = CartService::new(&store);
    let session = MemorySession::new();
    let user = CartContext::user(UserId::new(3), &session);

    carts.add_item(&user, products[0].id).await.unwrap();
    carts.add_item(&user, products[1].id).await.unwrap();

    CatalogService::new(&store)
        .delete_product(products[0].id)
        .await
        .unwrap();

    let cart = carts.get_active_cart(&user).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total, Decimal::new(5, 0));

    let persisted = carts.show_cart(UserId::new(3), cart.cart_id.unwrap()).await.unwrap();
    assert_eq!(persisted.0.total, Decimal::new(5, 0));
}

#[tokio::test]
async fn test_user_cart_shows_current_prices_after_edit() {
    let store = InMemoryStore::new();
    let (category, products) = create_fixture_catalog(&store, &[("Hammer", 20)]).await;
    let carts = CartService::new(&store);
    let session = MemorySession::new();
    let user = CartContext::user(UserId::new(4), &session);
    carts.add_item(&user, products[0].id).await.unwrap();

    store
        .update_product(
            products[0].id,
            &ProductDraft {
                name: "Hammer".to_owned(),
                price_ht: Decimal::new(25, 0),
                category_id: category.id,
            },
        )
        .await
        .unwrap();

    let cart = carts.get_active_cart(&user).await.unwrap();
    assert_eq!(cart.total, Decimal::new(25, 0));
}
