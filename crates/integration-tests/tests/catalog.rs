//! Integration tests for catalog administration, browsing, search and likes.

use std::time::Duration;

use axum::http::{StatusCode, header};
use serde_json::{Value, json};

use threadline_integration_tests::{TestApp, TestUser, test_config};
use threadline_storefront::config::StorefrontConfig;
use threadline_storefront::db::MemoryStore;

fn product_body(name: &str, category: &Value) -> Value {
    json!({
        "name": name,
        "description": "Heavyweight cotton",
        "price": "30.00",
        "category": category,
        "sizes": [{ "size": "S", "stock": 4 }, { "size": "L", "stock": 0 }],
        "colors": [
            { "name": "Ecru", "hex": "#f3efe0", "images": ["/img/ecru-1.jpg", "/img/ecru-2.jpg"] },
            { "name": "Navy", "hex": "#1d2a44", "images": ["/img/navy.jpg"] },
        ],
        "tags": ["basics"],
    })
}

async fn category(app: &TestApp, admin: &TestUser, name: &str) -> Value {
    let created = app
        .post("/categories", json!({ "name": name }), Some(admin))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    created.body
}

#[tokio::test]
async fn test_catalog_writes_need_an_admin() {
    let app = TestApp::new();
    let shopper = app.customer("shopper@threadline.test").await;

    let anonymous = app
        .post("/categories", json!({ "name": "Tops" }), None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let customer = app
        .post("/categories", json!({ "name": "Tops" }), Some(&shopper))
        .await;
    assert_eq!(customer.status, StatusCode::FORBIDDEN);
    assert_eq!(customer.error(), "Admin access required");

    let collection = app
        .post("/collections", json!({ "name": "Resort" }), Some(&shopper))
        .await;
    assert_eq!(collection.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_product_create_browse_and_deactivate() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let tops = category(&app, &admin, "Tops").await;
    let bottoms = category(&app, &admin, "Bottoms").await;

    let created = app
        .post("/products", product_body("Boxy Tee", &tops["id"]), Some(&admin))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.body["category_name"], "Tops");
    assert_eq!(created.body["featured_image"], "/img/ecru-1.jpg");
    assert_eq!(created.body["likes"], 0);
    assert!(
        created.body["sku"]
            .as_str()
            .is_some_and(|sku| sku.starts_with("TOP-"))
    );
    let tee = created.body["id"].clone();

    app.post("/products", product_body("Pleated Trouser", &bottoms["id"]), Some(&admin))
        .await;

    let all = app.get("/products", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().map(Vec::len), Some(2));
    assert!(all.headers.contains_key(header::CACHE_CONTROL));

    let filtered = app
        .get(&format!("/products?category={}", tops["id"]), None)
        .await;
    assert_eq!(filtered.body.as_array().map(Vec::len), Some(1));
    assert_eq!(filtered.body[0]["name"], "Boxy Tee");

    let removed = app
        .delete(&format!("/products/{tee}"), Some(&admin))
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["message"], "Product deleted successfully");

    let after = app.get("/products", None).await;
    assert_eq!(after.body.as_array().map(Vec::len), Some(1));

    let still_there = app.get(&format!("/products/{tee}"), None).await;
    assert_eq!(still_there.status, StatusCode::OK);
    assert_eq!(still_there.body["is_active"], false);

    let unknown = app.get("/products/9999", None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.error(), "Product not found");
}

#[tokio::test]
async fn test_product_validation() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let tops = category(&app, &admin, "Tops").await;
    let bottoms = category(&app, &admin, "Bottoms").await;

    let shorts = app
        .post(
            "/subcategories",
            json!({ "name": "Shorts", "category": bottoms["id"] }),
            Some(&admin),
        )
        .await;
    assert_eq!(shorts.status, StatusCode::CREATED);

    let mut mismatched = product_body("Boxy Tee", &tops["id"]);
    mismatched["sub_category"] = shorts.body["id"].clone();
    let response = app.post("/products", mismatched, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.error(),
        "SubCategory not found or does not belong to the selected category"
    );

    let mut no_colors = product_body("Boxy Tee", &tops["id"]);
    no_colors["colors"] = json!([]);
    let response = app.post("/products", no_colors, Some(&admin)).await;
    assert_eq!(response.error(), "At least one color is required");

    let mut bare_color = product_body("Boxy Tee", &tops["id"]);
    bare_color["colors"] = json!([{ "name": "Ecru", "hex": "#f3efe0", "images": [] }]);
    let response = app.post("/products", bare_color, Some(&admin)).await;
    assert_eq!(response.error(), "Each color must have at least one image");

    let response = app
        .post("/products", product_body("   ", &tops["id"]), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post("/products", product_body("Boxy Tee", &json!(9999)), Some(&admin))
        .await;
    assert_eq!(response.error(), "Category not found");

    let mut pricey = product_body("Gilded Tee", &tops["id"]);
    pricey["price"] = json!("40000000000000000000000000000");
    pricey["sizes"] = json!([{ "size": "M", "stock": 5 }, { "size": "L", "stock": 5 }]);
    let response = app.post("/products", pricey, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Price is too large");

    let listed = app.get("/products", None).await;
    assert_eq!(listed.body.as_array().map(Vec::len), Some(0));

    let malformed = app.get("/products/abc", None).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert!(!malformed.error().is_empty());
}

#[tokio::test]
async fn test_category_tree_and_delete_guards() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let tops = category(&app, &admin, "Tops").await;
    let tops_uri = format!("/categories/{}", tops["id"]);

    let duplicate = app
        .post("/categories", json!({ "name": "Tops" }), Some(&admin))
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.error(), "Category with this name already exists");

    let shirts = app
        .post(
            "/subcategories",
            json!({ "name": "Shirts", "category": tops["id"] }),
            Some(&admin),
        )
        .await;
    assert_eq!(shirts.status, StatusCode::CREATED);

    let tree = app.get("/categories", None).await;
    assert_eq!(tree.body[0]["name"], "Tops");
    assert_eq!(tree.body[0]["sub_categories"][0]["name"], "Shirts");

    let subs = app.get("/subcategories", None).await;
    assert_eq!(subs.body[0]["category_name"], "Tops");

    let blocked = app.delete(&tops_uri, Some(&admin)).await;
    assert_eq!(blocked.status, StatusCode::BAD_REQUEST);
    assert!(blocked.error().starts_with("Cannot delete category with subcategories"));

    let sub_uri = format!("/subcategories/{}", shirts.body["id"]);
    assert_eq!(app.delete(&sub_uri, Some(&admin)).await.status, StatusCode::OK);

    let product = app
        .post("/products", product_body("Boxy Tee", &tops["id"]), Some(&admin))
        .await;
    let blocked = app.delete(&tops_uri, Some(&admin)).await;
    assert!(blocked.error().starts_with("Cannot delete category with active products"));

    // Deactivating the category hides it from the default listing
    let hidden = app
        .put(&tops_uri, json!({ "name": "Tops", "is_active": false }), Some(&admin))
        .await;
    assert_eq!(hidden.status, StatusCode::OK);
    let listed = app.get("/categories", None).await;
    assert_eq!(listed.body, json!([]));
    let including = app.get("/categories?active_only=false", None).await;
    assert_eq!(including.body.as_array().map(Vec::len), Some(1));

    app.delete(&format!("/products/{}", product.body["id"]), Some(&admin))
        .await;
    let still_referenced = app.delete(&tops_uri, Some(&admin)).await;
    assert_eq!(still_referenced.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_collections_filter_and_dates() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;

    let resort = app
        .post(
            "/collections",
            json!({ "name": "Resort", "season": "Resort", "year": 2026, "is_featured": true }),
            Some(&admin),
        )
        .await;
    assert_eq!(resort.status, StatusCode::CREATED, "{:?}", resort.body);
    app.post(
        "/collections",
        json!({ "name": "Winter Wool", "season": "Winter", "year": 2025 }),
        Some(&admin),
    )
    .await;

    let backwards = app
        .post(
            "/collections",
            json!({
                "name": "Holiday Knits",
                "season": "Holiday",
                "start_date": "2026-12-01T00:00:00Z",
                "end_date": "2026-11-01T00:00:00Z",
            }),
            Some(&admin),
        )
        .await;
    assert_eq!(backwards.status, StatusCode::BAD_REQUEST);

    let all = app.get("/collections", None).await;
    assert_eq!(all.body.as_array().map(Vec::len), Some(2));
    assert_eq!(all.body[0]["name"], "Resort");

    let featured = app.get("/collections?featured=true", None).await;
    assert_eq!(featured.body.as_array().map(Vec::len), Some(1));

    let winter = app.get("/collections?season=Winter", None).await;
    assert_eq!(winter.body[0]["name"], "Winter Wool");

    let uri = format!("/collections/{}", resort.body["id"]);
    let deleted = app.delete(&uri, Some(&admin)).await;
    assert_eq!(deleted.body["message"], "Collection deleted successfully");
    assert_eq!(app.get(&uri, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_likes_are_idempotent() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let product = app.product_with_stock(&admin, "Canvas Tote", 3).await;
    let shopper = app.customer("shopper@threadline.test").await;
    let uri = format!("/products/{product}/like");

    let liked = app.post(&uri, json!({ "liked": true }), Some(&shopper)).await;
    assert_eq!(liked.status, StatusCode::OK);
    assert_eq!(liked.body, json!({ "message": "Product liked", "likes": 1 }));

    let again = app.post(&uri, json!({ "liked": true }), Some(&shopper)).await;
    assert_eq!(again.body["likes"], 1);

    let admin_like = app.post(&uri, json!({ "liked": true }), Some(&admin)).await;
    assert_eq!(admin_like.body["likes"], 2);

    let mine = app.get("/users/likes", Some(&shopper)).await;
    assert_eq!(mine.body[0]["id"].as_i64(), Some(product));

    let unliked = app.post(&uri, json!({ "liked": false }), Some(&shopper)).await;
    assert_eq!(unliked.body, json!({ "message": "Product unliked", "likes": 1 }));
    assert_eq!(app.get("/users/likes", Some(&shopper)).await.body, json!([]));

    let unknown = app
        .post("/products/9999/like", json!({ "liked": true }), Some(&shopper))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let anonymous = app.post(&uri, json!({ "liked": true }), None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_advanced_search() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let tops = category(&app, &admin, "Tops").await;

    let mut tee = product_body("Boxy Tee", &tops["id"]);
    tee["price"] = json!("30.00");
    app.post("/products", tee, Some(&admin)).await;

    let mut shirt = product_body("Camp Shirt", &tops["id"]);
    shirt["price"] = json!("55.00");
    shirt["sizes"] = json!([{ "size": "M", "stock": 2 }]);
    shirt["colors"] = json!([{ "name": "Olive", "hex": "#556b2f", "images": ["/img/olive.jpg"] }]);
    shirt["tags"] = json!(["Summer"]);
    app.post("/products", shirt, Some(&admin)).await;

    let mut knit = product_body("Aran Knit", &tops["id"]);
    knit["price"] = json!("120.00");
    knit["description"] = json!("Hand-finished wool");
    app.post("/products", knit, Some(&admin)).await;

    let names = |body: &Value| -> Vec<String> {
        body.as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|p| p["name"].as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    };

    let all = app.get("/products/advanced", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert!(all.headers.contains_key(header::CACHE_CONTROL));
    assert_eq!(names(&all.body), ["Aran Knit", "Camp Shirt", "Boxy Tee"]);

    let by_name = app.get("/products/advanced?sort=name", None).await;
    assert_eq!(names(&by_name.body), ["Aran Knit", "Boxy Tee", "Camp Shirt"]);

    let cheapest = app
        .get("/products/advanced?sort=price-low&limit=2", None)
        .await;
    assert_eq!(names(&cheapest.body), ["Boxy Tee", "Camp Shirt"]);

    let ranged = app
        .get("/products/advanced?min_price=40&max_price=150&sort=price-high", None)
        .await;
    assert_eq!(names(&ranged.body), ["Aran Knit", "Camp Shirt"]);

    let sized = app.get("/products/advanced?sizes=M,XL", None).await;
    assert_eq!(names(&sized.body), ["Camp Shirt"]);

    let colored = app.get("/products/advanced?colors=navy", None).await;
    assert_eq!(names(&colored.body), ["Aran Knit", "Boxy Tee"]);

    let tagged = app.get("/products/advanced?search=SUMMER", None).await;
    assert_eq!(names(&tagged.body), ["Camp Shirt"]);
    let described = app.get("/products/advanced?search=wool", None).await;
    assert_eq!(names(&described.body), ["Aran Knit"]);

    let bad_size = app.get("/products/advanced?sizes=HUGE", None).await;
    assert_eq!(bad_size.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_size.error(), "unknown size: HUGE");

    let bad_price = app.get("/products/advanced?min_price=cheap", None).await;
    assert_eq!(bad_price.status, StatusCode::BAD_REQUEST);
    assert!(!bad_price.error().is_empty());
}

#[tokio::test]
async fn test_slow_listing_returns_408() {
    let config = StorefrontConfig {
        product_list_timeout: Duration::from_millis(1),
        ..test_config()
    };
    let store = MemoryStore::new().with_listing_latency(Duration::from_millis(200));
    let app = TestApp::with_store(store, config);

    let listing = app.get("/products", None).await;
    assert_eq!(listing.status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(listing.error(), "Request timed out");

    let search = app.get("/products/advanced", None).await;
    assert_eq!(search.status, StatusCode::REQUEST_TIMEOUT);
}
