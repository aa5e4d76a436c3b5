//! Integration tests for Threadline.
//!
//! The storefront router runs in process on top of the in-memory store and an
//! in-memory session store, so the suite needs no database or server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p threadline-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart` - Stock checks and line merging
//! - `checkout` - Orders, status changes and notifications
//! - `reviews` - Review eligibility and ownership
//! - `catalog` - Admin catalog CRUD, search, likes and role checks
//! - `auth` - Accounts, sessions and admin user management

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use threadline_core::{Email, UserRole};
use threadline_storefront::config::StorefrontConfig;
use threadline_storefront::db::{MemoryStore, UserStore};
use threadline_storefront::state::AppState;

/// Password every test account signs up with.
pub const PASSWORD: &str = "correct-horse-battery";

/// A response with its body decoded as JSON (`Null` when empty, a string
/// when not JSON).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub set_cookie: Option<String>,
}

impl TestResponse {
    /// The `error` field of an error body.
    #[must_use]
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// A signed-in account: its session cookie and id.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub cookie: String,
    pub id: i64,
}

/// The storefront app plus a handle on its store.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), test_config())
    }

    /// An app over a prepared store and configuration.
    #[must_use]
    pub fn with_store(store: MemoryStore, config: StorefrontConfig) -> Self {
        let store = Arc::new(store);
        let state = AppState::new(config, store.clone());
        let router = threadline_storefront::app(state, tower_sessions::MemoryStore::default());
        Self { router, store }
    }

    /// Send one request, optionally with a JSON body and a session cookie.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_owned);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
            set_cookie,
        }
    }

    pub async fn get(&self, uri: &str, user: Option<&TestUser>) -> TestResponse {
        self.request(Method::GET, uri, None, user.map(|u| u.cookie.as_str()))
            .await
    }

    pub async fn post(&self, uri: &str, body: Value, user: Option<&TestUser>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), user.map(|u| u.cookie.as_str()))
            .await
    }

    pub async fn put(&self, uri: &str, body: Value, user: Option<&TestUser>) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), user.map(|u| u.cookie.as_str()))
            .await
    }

    pub async fn delete(&self, uri: &str, user: Option<&TestUser>) -> TestResponse {
        self.request(Method::DELETE, uri, None, user.map(|u| u.cookie.as_str()))
            .await
    }

    /// Sign up a customer and log in.
    ///
    /// # Panics
    ///
    /// Panics if signup or login fails.
    pub async fn customer(&self, email: &str) -> TestUser {
        let signup = self
            .post(
                "/auth/signup",
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": "Shopper",
                }),
                None,
            )
            .await;
        assert_eq!(signup.status, StatusCode::CREATED, "{:?}", signup.body);

        self.login(email).await
    }

    /// Sign up, promote to admin, then log in so the session carries the role.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn admin(&self, email: &str) -> TestUser {
        self.customer(email).await;
        let email_addr = Email::parse(email).expect("valid email");
        self.store
            .set_user_role(&email_addr, UserRole::Admin)
            .await
            .expect("store is available")
            .expect("account exists");

        self.login(email).await
    }

    /// Log in with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if login fails or sets no cookie.
    pub async fn login(&self, email: &str) -> TestUser {
        let login = self
            .post(
                "/auth/login",
                json!({ "email": email, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);

        TestUser {
            cookie: login.set_cookie.expect("login sets a session cookie"),
            id: login.body["user"]["id"].as_i64().expect("user id"),
        }
    }

    /// Create a category and one product in it with a single `M` size.
    /// Returns the product id.
    ///
    /// # Panics
    ///
    /// Panics if either create fails.
    pub async fn product_with_stock(&self, admin: &TestUser, name: &str, stock: u32) -> i64 {
        let category = self
            .post(
                "/categories",
                json!({ "name": format!("{name} Category") }),
                Some(admin),
            )
            .await;
        assert_eq!(category.status, StatusCode::CREATED, "{:?}", category.body);

        let product = self
            .post(
                "/products",
                json!({
                    "name": name,
                    "description": format!("{name} for tests"),
                    "price": "25.00",
                    "category": category.body["id"],
                    "sizes": [{ "size": "M", "stock": stock }],
                    "colors": [{ "name": "Black", "hex": "#000000", "images": ["/img/black.jpg"] }],
                }),
                Some(admin),
            )
            .await;
        assert_eq!(product.status, StatusCode::CREATED, "{:?}", product.body);
        product.body["id"].as_i64().expect("product id")
    }

    /// Place an order for whatever is in `user`'s cart.
    ///
    /// # Panics
    ///
    /// Panics if the cart cannot be read or the order is rejected.
    pub async fn checkout(&self, user: &TestUser) -> Value {
        let cart = self.get("/cart", Some(user)).await;
        let items: Vec<Value> = cart.body["items"]
            .as_array()
            .expect("cart items")
            .iter()
            .map(|line| {
                json!({
                    "product_id": line["product_id"],
                    "size": line["size"],
                    "quantity": line["quantity"],
                    "price": line["price"],
                })
            })
            .collect();

        let order = self
            .post(
                "/orders",
                json!({
                    "items": items,
                    "total": cart.body["total"],
                    "customer_info": {
                        "full_name": "Test Shopper",
                        "phone_number": "+1 555 0100",
                        "address": "1 Loom Street",
                    },
                }),
                Some(user),
            )
            .await;
        assert_eq!(order.status, StatusCode::OK, "{:?}", order.body);
        order.body["order"].clone()
    }
}

/// Configuration for an in-process app. Nothing here is dialed.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused@localhost/threadline_test"),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        product_list_timeout: Duration::from_secs(5),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_traces_sample_rate: 0.0,
    }
}
