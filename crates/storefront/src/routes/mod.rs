//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (store ping)
//!
//! # Accounts
//! POST /auth/signup                 - Create an account
//! POST /auth/login                  - Sign in (session cookie)
//! POST /auth/logout                 - Sign out
//! GET  /auth/me                     - Current account
//!
//! # Cart (signed in, GET also anonymous)
//! GET    /cart                      - Cart with products resolved
//! POST   /cart                      - Add a product size
//! PUT    /cart                      - Set a line's quantity
//! DELETE /cart[?item_id=]           - Remove a line or empty the cart
//!
//! # Orders (signed in)
//! GET  /orders                      - Own orders, or all for admins
//! POST /orders                      - Check out
//! PUT  /orders/{id}                 - Change status (admin)
//!
//! # Reviews (signed in)
//! GET    /reviews?product_id=       - A product's reviews
//! POST   /reviews                   - Review a delivered item
//! DELETE /reviews/{id}              - Delete own review
//! GET    /reviews/user              - Own reviews
//! GET    /reviews/eligible-products - Items waiting for a review
//!
//! # Catalog (writes are admin-only)
//! GET|POST         /products
//! GET|PUT|DELETE   /products/{id}
//! POST             /products/{id}/like
//! GET              /users/likes
//! GET|POST         /categories, /subcategories, /collections
//! GET|PUT|DELETE   /categories/{id}, /subcategories/{id}, /collections/{id}
//!
//! # Notifications (signed in)
//! GET /notifications?limit=         - Feed and unread count
//! PUT /notifications                - Mark one or all read
//! ```

pub mod auth;
pub mod cart;
pub mod categories;
pub mod collections;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reviews;

use axum::Router;

use crate::state::AppState;

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(cart::router())
        .merge(orders::router())
        .merge(reviews::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(collections::router())
        .merge(notifications::router())
}
