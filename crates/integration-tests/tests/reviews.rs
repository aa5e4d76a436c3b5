//! Integration tests for reviews of delivered order items.

use axum::http::StatusCode;
use serde_json::{Value, json};

use threadline_integration_tests::{TestApp, TestUser};

/// Buy one unit of `product` and have the admin mark the order delivered.
async fn delivered_order(app: &TestApp, admin: &TestUser, shopper: &TestUser, product: i64) -> Value {
    app.post("/cart", json!({ "product_id": product, "size": "M" }), Some(shopper))
        .await;
    let order = app.checkout(shopper).await;
    let delivered = app
        .put(
            &format!("/orders/{}", order["id"]),
            json!({ "status": "delivered" }),
            Some(admin),
        )
        .await;
    assert_eq!(delivered.status, StatusCode::OK, "{:?}", delivered.body);
    order
}

#[tokio::test]
async fn test_review_lifecycle() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let product = app.product_with_stock(&admin, "Chore Coat", 5).await;
    let shopper = app.customer("shopper@threadline.test").await;
    let order = delivered_order(&app, &admin, &shopper, product).await;

    let eligible = app.get("/reviews/eligible-products", Some(&shopper)).await;
    assert_eq!(eligible.status, StatusCode::OK);
    assert_eq!(eligible.body[0]["product"]["id"].as_i64(), Some(product));
    assert_eq!(eligible.body[0]["order"]["id"], order["id"]);

    let review = app
        .post(
            "/reviews",
            json!({
                "product_id": product,
                "order_id": order["id"],
                "rating": 5,
                "title": "  Warm and sturdy  ",
                "comment": "",
            }),
            Some(&shopper),
        )
        .await;
    assert_eq!(review.status, StatusCode::OK, "{:?}", review.body);
    assert_eq!(review.body["title"], "Warm and sturdy");
    assert!(review.body["comment"].is_null());
    assert_eq!(review.body["is_verified"], true);

    let again = app
        .post(
            "/reviews",
            json!({ "product_id": product, "order_id": order["id"], "rating": 4 }),
            Some(&shopper),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.error(), "Review already exists");

    let eligible = app.get("/reviews/eligible-products", Some(&shopper)).await;
    assert_eq!(eligible.body, json!([]));

    let listed = app
        .get(&format!("/reviews?product_id={product}"), Some(&shopper))
        .await;
    assert_eq!(listed.body[0]["reviewer_first_name"], "Test");
    let mine = app.get("/reviews/user", Some(&shopper)).await;
    assert_eq!(mine.body[0]["product_name"], "Chore Coat");

    let review_uri = format!("/reviews/{}", review.body["id"]);
    let stranger = app.customer("stranger@threadline.test").await;
    let not_yours = app.delete(&review_uri, Some(&stranger)).await;
    assert_eq!(not_yours.status, StatusCode::UNAUTHORIZED);

    let deleted = app.delete(&review_uri, Some(&shopper)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Review deleted successfully");

    let gone = app.delete(&review_uri, Some(&shopper)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.error(), "Review not found");
}

#[tokio::test]
async fn test_review_requires_delivered_owned_order() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let product = app.product_with_stock(&admin, "Chore Coat", 5).await;
    let other_product = app.product_with_stock(&admin, "Field Cap", 5).await;
    let shopper = app.customer("shopper@threadline.test").await;

    app.post("/cart", json!({ "product_id": product, "size": "M" }), Some(&shopper))
        .await;
    let pending = app.checkout(&shopper).await;

    let not_delivered = app
        .post(
            "/reviews",
            json!({ "product_id": product, "order_id": pending["id"], "rating": 5 }),
            Some(&shopper),
        )
        .await;
    assert_eq!(not_delivered.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_delivered.error(), "Order not found or not delivered");

    let delivered = delivered_order(&app, &admin, &shopper, product).await;

    let wrong_product = app
        .post(
            "/reviews",
            json!({ "product_id": other_product, "order_id": delivered["id"], "rating": 5 }),
            Some(&shopper),
        )
        .await;
    assert_eq!(wrong_product.error(), "Order not found or not delivered");

    let stranger = app.customer("stranger@threadline.test").await;
    let not_owner = app
        .post(
            "/reviews",
            json!({ "product_id": product, "order_id": delivered["id"], "rating": 5 }),
            Some(&stranger),
        )
        .await;
    assert_eq!(not_owner.error(), "Order not found or not delivered");

    let bad_rating = app
        .post(
            "/reviews",
            json!({ "product_id": product, "order_id": delivered["id"], "rating": 6 }),
            Some(&shopper),
        )
        .await;
    assert_eq!(bad_rating.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_reads_require_a_session() {
    let app = TestApp::new();

    let anonymous = app.get("/reviews?product_id=1", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let shopper = app.customer("shopper@threadline.test").await;
    let missing = app.get("/reviews", Some(&shopper)).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.error(), "Product ID is required");
}
