//! HTTP tests against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The storefront running (cargo run -p comptoir-storefront)
//! - At least one product in the catalog (comptoir seed ...)
//!
//! Run with: cargo test -p comptoir-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use comptoir_integration_tests::{browser, storefront_base_url, unique_email};
use reqwest::{StatusCode, header};

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned()
}

/// First product link on the catalog page, e.g. `/products/12`.
async fn first_product_path(client: &reqwest::Client) -> String {
    let body = client
        .get(format!("{}/products", storefront_base_url()))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let card = body.find("class=\"product\"").unwrap();
    let start = card + body[card..].find("href=\"").unwrap() + "href=\"".len();
    let end = start + body[start..].find('"').unwrap();
    body[start..end].to_owned()
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_health_endpoints() {
    let client = browser();
    let base = storefront_base_url();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/health/ready"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_guest_cart_round_trip() {
    let client = browser();
    let base = storefront_base_url();
    let product = first_product_path(&client).await;

    let resp = client
        .post(format!("{base}{product}/add-to-cart"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/cart");

    let count = client
        .get(format!("{base}/cart/count"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(count.contains("(1)"));
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_registered_user_can_validate_cart() {
    let client = browser();
    let base = storefront_base_url();
    let email = unique_email("http");

    let resp = client
        .post(format!("{base}/auth/register"))
        .form(&[
            ("email", email.as_str()),
            ("password", "correct horse battery"),
            ("password_confirm", "correct horse battery"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), "/products");

    let resp = client.post(format!("{base}/cart/new")).send().await.unwrap();
    let cart = location(&resp);
    assert!(cart.starts_with("/cart/"));

    let product = first_product_path(&client).await;
    client
        .post(format!("{base}{product}/add-to-cart"))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}{cart}/validate"))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&resp), cart);

    let body = client
        .get(format!("{base}{cart}"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Status: finalized"));
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_admin_requires_login() {
    let client = browser();
    let resp = client
        .get(format!("{}/products/new", storefront_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/auth/login");
}
