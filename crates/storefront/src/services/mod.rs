//! Business logic services for the storefront.
//!
//! Each service borrows the [`Store`](crate::db::Store) for the duration of a
//! request and returns [`AppError`](crate::error::AppError) so handlers can
//! pass results straight through.
//!
//! # Services
//!
//! - `auth` - Email/password accounts and roles
//! - `cart` - Per-user cart with stock checks
//! - `catalog` - Categories, subcategories, collections, products and likes
//! - `notifications` - Per-user notification feed and fan-out
//! - `orders` - Checkout and order status
//! - `reviews` - Reviews of delivered order items

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod reviews;

pub use auth::{AuthError, AuthService, Profile, Signup};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use notifications::NotificationService;
pub use orders::OrderService;
pub use reviews::ReviewService;
