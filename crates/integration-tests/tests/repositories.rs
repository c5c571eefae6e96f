//! `PostgreSQL` repository tests.
//!
//! These tests require a reachable database in `STOREFRONT_DATABASE_URL`.
//! Run with: cargo test -p comptoir-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use comptoir_core::{CartStatus, Email, UserId};
use comptoir_integration_tests::{create_fixture_catalog, pg_stores, unique_email, unique_name};
use comptoir_storefront::db::{CartStore, CatalogStore, RepositoryError, Stores, UserStore};
use comptoir_storefront::models::{ProductDraft, ProductFilter};
use rust_decimal::Decimal;

async fn fixture_user<S: Stores>(stores: &S) -> UserId {
    let email = Email::parse(&unique_email("repo")).unwrap();
    stores.users().create(&email, "not-a-real-hash").await.unwrap().id
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_catalog_filters_and_constraints() {
    let stores = pg_stores().await;
    let catalog = stores.catalog();
    let (category, products) =
        create_fixture_catalog(catalog, &[("Cheap", 5), ("Mid", 20), ("Dear", 60)]).await;

    let filter = ProductFilter {
        category_ids: vec![category.id],
        price_min: Some(Decimal::new(5, 0)),
        price_max: Some(Decimal::new(20, 0)),
    };
    let names: Vec<_> = catalog
        .list_products(&filter)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, ["Cheap", "Mid"]);

    let err = catalog.create_category(&category.name).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let err = catalog.delete_category(category.id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    for product in &products {
        assert!(catalog.delete_product(product.id).await.unwrap());
    }
    assert!(catalog.delete_category(category.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_product_update_moves_category() {
    let stores = pg_stores().await;
    let catalog = stores.catalog();
    let (_, products) = create_fixture_catalog(catalog, &[("Lamp", 30)]).await;
    let target = catalog.create_category(&unique_name("Target")).await.unwrap();

    let updated = catalog
        .update_product(
            products[0].id,
            &ProductDraft {
                name: "Desk lamp".to_owned(),
                price_ht: Decimal::new(3250, 2),
                category_id: target.id,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.category, target);
    assert_eq!(updated.price_ht, Decimal::new(3250, 2));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_cart_totals_track_lines() {
    let stores = pg_stores().await;
    let (_, products) =
        create_fixture_catalog(stores.catalog(), &[("Hammer", 20), ("Saw", 5)]).await;
    let (hammer, saw) = (&products[0], &products[1]);
    let user = fixture_user(&stores).await;
    let carts = stores.carts();

    carts.add_product(user, hammer).await.unwrap();
    carts.add_product(user, hammer).await.unwrap();
    let cart = carts.add_product(user, saw).await.unwrap();
    assert_eq!(cart.total, Decimal::new(45, 0));

    assert!(carts.set_line_quantity(cart.id, saw.id, 3).await.unwrap());
    assert!(carts.remove_line(cart.id, hammer.id).await.unwrap());
    assert!(!carts.remove_line(cart.id, hammer.id).await.unwrap());

    let cart = carts.find(cart.id).await.unwrap().unwrap();
    assert_eq!(cart.total, Decimal::new(15, 0));
    let lines = carts.lines(cart.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_price_edit_moves_open_cart_totals_only() {
    let stores = pg_stores().await;
    let (category, products) =
        create_fixture_catalog(stores.catalog(), &[("Widget", 20), ("Gadget", 5)]).await;
    let (widget, gadget) = (&products[0], &products[1]);
    let carts = stores.carts();

    let shopper = fixture_user(&stores).await;
    let open = carts.add_product(shopper, widget).await.unwrap();

    let buyer = fixture_user(&stores).await;
    carts.add_product(buyer, widget).await.unwrap();
    let validated = carts.add_product(buyer, gadget).await.unwrap();
    carts.finalize(validated.id).await.unwrap();

    stores
        .catalog()
        .update_product(
            widget.id,
            &ProductDraft {
                name: widget.name.clone(),
                price_ht: Decimal::new(30, 0),
                category_id: category.id,
            },
        )
        .await
        .unwrap();

    let open = carts.find(open.id).await.unwrap().unwrap();
    assert_eq!(open.total, Decimal::new(30, 0));
    assert!(carts.remove_line(open.id, widget.id).await.unwrap());
    assert_eq!(carts.find(open.id).await.unwrap().unwrap().total, Decimal::ZERO);

    stores.catalog().delete_product(gadget.id).await.unwrap();
    let validated = carts.find(validated.id).await.unwrap().unwrap();
    assert_eq!(validated.total, Decimal::new(25, 0));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_one_open_cart_per_user() {
    let stores = pg_stores().await;
    let user = fixture_user(&stores).await;
    let carts = stores.carts();

    let first = carts.get_or_create_open(user).await.unwrap();
    let second = carts.get_or_create_open(user).await.unwrap();
    assert_eq!(first.id, second.id);

    assert_eq!(carts.finalize(first.id).await.unwrap(), CartStatus::Open);
    assert_eq!(carts.finalize(first.id).await.unwrap(), CartStatus::Finalized);
    assert!(carts.find_open(user).await.unwrap().is_none());

    let next = carts.get_or_create_open(user).await.unwrap();
    assert_ne!(next.id, first.id);

    assert!(carts.delete(first.id).await.unwrap());
    assert!(carts.find(first.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_email_conflicts() {
    let stores = pg_stores().await;
    let email = Email::parse(&unique_email("dup")).unwrap();

    stores.users().create(&email, "hash").await.unwrap();
    let err = stores.users().create(&email, "hash").await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let (user, hash) = stores.users().find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(user.email, email);
    assert_eq!(hash, "hash");
}
