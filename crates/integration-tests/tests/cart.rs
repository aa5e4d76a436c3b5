//! Integration tests for the cart API: stock checks and line merging.

use axum::http::StatusCode;
use serde_json::json;

use threadline_integration_tests::TestApp;

#[tokio::test]
async fn test_anonymous_cart_is_empty_but_writes_need_a_session() {
    let app = TestApp::new();

    let cart = app.get("/cart", None).await;
    assert_eq!(cart.status, StatusCode::OK);
    assert_eq!(cart.body["items"], json!([]));
    assert_eq!(cart.body["item_count"], 0);

    let add = app
        .post("/cart", json!({ "product_id": 1, "size": "M" }), None)
        .await;
    assert_eq!(add.status, StatusCode::UNAUTHORIZED);
    assert_eq!(add.error(), "Unauthorized");
}

#[tokio::test]
async fn test_add_merges_lines_until_stock_runs_out() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let product = app.product_with_stock(&admin, "Wool Scarf", 3).await;
    let shopper = app.customer("shopper@threadline.test").await;

    let first = app
        .post(
            "/cart",
            json!({ "product_id": product, "size": "M", "quantity": 2, "color": { "name": "Black" } }),
            Some(&shopper),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK, "{:?}", first.body);
    assert_eq!(first.body["message"], "Item added to cart");
    assert_eq!(first.body["item_count"], 2);

    // Same product, size and color: one line with quantity 3
    let second = app
        .post(
            "/cart",
            json!({ "product_id": product, "size": "M", "color": { "name": "Black" } }),
            Some(&shopper),
        )
        .await;
    assert_eq!(second.status, StatusCode::OK);
    let items = second.body["items"].as_array().unwrap_or(&Vec::new()).clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[0]["product"]["name"], "Wool Scarf");

    let over = app
        .post(
            "/cart",
            json!({ "product_id": product, "size": "M", "color": { "name": "Black" } }),
            Some(&shopper),
        )
        .await;
    assert_eq!(over.status, StatusCode::BAD_REQUEST);
    assert_eq!(over.error(), "Only 3 in stock for size M (3 already in cart)");

    let cart = app.get("/cart", Some(&shopper)).await;
    assert_eq!(cart.body["item_count"], 3);
}

#[tokio::test]
async fn test_add_validates_fields_and_size() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let product = app.product_with_stock(&admin, "Linen Shirt", 5).await;
    let shopper = app.customer("shopper@threadline.test").await;

    let missing = app
        .post("/cart", json!({ "product_id": product }), Some(&shopper))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.error(), "Product ID and size are required");

    let unknown_size = app
        .post(
            "/cart",
            json!({ "product_id": product, "size": "HUGE" }),
            Some(&shopper),
        )
        .await;
    assert_eq!(unknown_size.status, StatusCode::BAD_REQUEST);

    let unstocked = app
        .post(
            "/cart",
            json!({ "product_id": product, "size": "XS" }),
            Some(&shopper),
        )
        .await;
    assert_eq!(unstocked.status, StatusCode::BAD_REQUEST);
    assert_eq!(unstocked.error(), "Size XS is not available for this product");

    let zero = app
        .post(
            "/cart",
            json!({ "product_id": product, "size": "M", "quantity": 0 }),
            Some(&shopper),
        )
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);
    assert_eq!(zero.error(), "Quantity must be at least 1");

    let no_product = app
        .post("/cart", json!({ "product_id": 9999, "size": "M" }), Some(&shopper))
        .await;
    assert_eq!(no_product.status, StatusCode::NOT_FOUND);
    assert_eq!(no_product.error(), "Product not found");
}

#[tokio::test]
async fn test_malformed_cart_bodies_are_json_errors() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let product = app.product_with_stock(&admin, "Linen Shirt", 5).await;
    let shopper = app.customer("shopper@threadline.test").await;

    let wordy = app
        .post(
            "/cart",
            json!({ "product_id": product, "size": "M", "quantity": "two" }),
            Some(&shopper),
        )
        .await;
    assert_eq!(wordy.status, StatusCode::BAD_REQUEST);
    assert!(!wordy.error().is_empty());

    let bad_query = app.delete("/cart?item_id=first", Some(&shopper)).await;
    assert_eq!(bad_query.status, StatusCode::BAD_REQUEST);
    assert!(!bad_query.error().is_empty());
}

#[tokio::test]
async fn test_update_remove_and_clear() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let scarf = app.product_with_stock(&admin, "Wool Scarf", 4).await;
    let hat = app.product_with_stock(&admin, "Knit Hat", 2).await;
    let shopper = app.customer("shopper@threadline.test").await;

    app.post("/cart", json!({ "product_id": scarf, "size": "M" }), Some(&shopper))
        .await;
    let cart = app
        .post("/cart", json!({ "product_id": hat, "size": "M" }), Some(&shopper))
        .await;
    let scarf_line = cart.body["items"][0]["id"].as_i64().unwrap_or_default();
    let hat_line = cart.body["items"][1]["id"].as_i64().unwrap_or_default();

    let too_many = app
        .put(
            "/cart",
            json!({ "item_id": hat_line, "quantity": 3 }),
            Some(&shopper),
        )
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);

    let updated = app
        .put(
            "/cart",
            json!({ "item_id": scarf_line, "quantity": 4 }),
            Some(&shopper),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["message"], "Cart updated");
    assert_eq!(updated.body["item_count"], 5);
    assert_eq!(updated.body["total"], "125.00");

    let zeroed = app
        .put(
            "/cart",
            json!({ "item_id": hat_line, "quantity": 0 }),
            Some(&shopper),
        )
        .await;
    assert_eq!(zeroed.body["items"].as_array().map(Vec::len), Some(1));

    let missing = app
        .put("/cart", json!({ "item_id": scarf_line }), Some(&shopper))
        .await;
    assert_eq!(missing.error(), "Item ID and quantity are required");

    let removed = app
        .delete(&format!("/cart?item_id={scarf_line}"), Some(&shopper))
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["message"], "Item removed from cart");
    assert_eq!(removed.body["item_count"], 0);

    let cleared = app.delete("/cart", Some(&shopper)).await;
    assert_eq!(cleared.body["message"], "Cart cleared");
}
