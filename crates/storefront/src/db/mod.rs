//! Persistence for the storefront.
//!
//! Handlers and services talk to a [`Store`], the union of one trait per
//! aggregate. [`PgStore`] is the production implementation on `PostgreSQL`;
//! [`MemoryStore`] keeps everything in process for tests and local demos.
//!
//! ## Tables
//!
//! - `users` - Accounts, password hashes and roles
//! - `categories`, `sub_categories`, `collections`, `products` - Catalog
//! - `product_likes` - Which user liked which product
//! - `carts`, `cart_items` - One cart per user and its lines
//! - `orders` - Immutable order snapshots (items and contact as JSONB)
//! - `reviews` - One review per (user, product, order)
//! - `notifications` - Per-user notification feed
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p threadline-cli -- migrate
//! ```

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use threadline_core::{
    CategoryId, CollectionId, Email, NotificationId, OrderId, OrderStatus, ProductId, ReviewId,
    SubCategoryId, UserId, UserRole,
};

use crate::models::{
    CartCommand, CartError, CartView, CatalogRef, Category, CategoryInput, CategoryView,
    Collection, CollectionFilter, CollectionInput, LikeOutcome, NewNotification, NewOrder,
    NewProduct, NewReview, NewUser, Notification, Order, OrderScope, Product, ProductDraft,
    ProductFilter, ProductSearch, ProductView, ProfileUpdate, Review, ReviewView, SubCategory,
    SubCategoryInput, SubCategoryView, User, UserSummary,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Failure of an atomic cart write: either the command was rejected or the
/// store itself failed.
#[derive(Debug, Error)]
pub enum CartWriteError {
    #[error(transparent)]
    Rejected(#[from] CartError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartWriteError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Store traits
// =============================================================================

/// Accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// The user and their password hash, if the email is registered.
    async fn get_password_hash(&self, email: &Email) -> Result<Option<(User, String)>>;

    async fn set_user_role(&self, email: &Email, role: UserRole) -> Result<Option<User>>;
    async fn set_user_role_by_id(&self, id: UserId, role: UserRole) -> Result<Option<User>>;

    /// Every account, oldest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn password_hash_for(&self, id: UserId) -> Result<Option<String>>;
    /// `false` when the user does not exist.
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool>;

    /// Returns `RepositoryError::Conflict` if another account has the email.
    async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<Option<User>>;

    async fn list_admin_ids(&self) -> Result<Vec<UserId>>;

    async fn user_summaries(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserSummary>>;
}

/// Categories, subcategories, collections, products and likes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self, active_only: bool) -> Result<Vec<CategoryView>>;
    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryView>>;
    /// Case-insensitive name lookup, ignoring `except`.
    async fn category_name_exists(&self, name: &str, except: Option<CategoryId>) -> Result<bool>;
    async fn insert_category(&self, input: &CategoryInput) -> Result<Category>;
    async fn update_category(&self, id: CategoryId, input: &CategoryInput)
    -> Result<Option<Category>>;
    async fn delete_category(&self, id: CategoryId) -> Result<bool>;
    async fn count_sub_categories(&self, category: CategoryId) -> Result<i64>;

    async fn list_sub_categories(&self, active_only: bool) -> Result<Vec<SubCategoryView>>;
    async fn get_sub_category(&self, id: SubCategoryId) -> Result<Option<SubCategoryView>>;
    /// Case-insensitive name lookup within one category, ignoring `except`.
    async fn sub_category_name_exists(
        &self,
        category: CategoryId,
        name: &str,
        except: Option<SubCategoryId>,
    ) -> Result<bool>;
    async fn insert_sub_category(&self, input: &SubCategoryInput) -> Result<SubCategory>;
    async fn update_sub_category(
        &self,
        id: SubCategoryId,
        input: &SubCategoryInput,
    ) -> Result<Option<SubCategory>>;
    async fn delete_sub_category(&self, id: SubCategoryId) -> Result<bool>;

    async fn list_collections(&self, filter: &CollectionFilter) -> Result<Vec<Collection>>;
    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>>;
    async fn collection_name_exists(&self, name: &str, except: Option<CollectionId>)
    -> Result<bool>;
    async fn insert_collection(&self, input: &CollectionInput, year: i32) -> Result<Collection>;
    async fn update_collection(
        &self,
        id: CollectionId,
        input: &CollectionInput,
        year: i32,
    ) -> Result<Option<Collection>>;
    async fn delete_collection(&self, id: CollectionId) -> Result<bool>;

    /// Active products that reference `node`.
    async fn count_active_products(&self, node: CatalogRef) -> Result<i64>;

    /// Active products matching `filter`, newest first.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductView>>;
    /// Active products matching `search`, in its sort order, at most
    /// `search.limit` of them.
    async fn search_products(&self, search: &ProductSearch) -> Result<Vec<ProductView>>;
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductView>>;
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>>;
    /// Returns `RepositoryError::Conflict` if the SKU is taken.
    async fn insert_product(&self, product: &NewProduct) -> Result<Product>;
    async fn update_product(&self, id: ProductId, draft: &ProductDraft)
    -> Result<Option<Product>>;
    async fn deactivate_product(&self, id: ProductId) -> Result<bool>;

    /// Idempotently like or unlike; `None` when the product does not exist.
    async fn set_like(
        &self,
        user: UserId,
        product: ProductId,
        liked: bool,
    ) -> Result<Option<LikeOutcome>>;
    async fn liked_products(&self, user: UserId) -> Result<Vec<Product>>;
}

/// Per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart with products resolved, or `None` if never created.
    async fn get_cart(&self, user: UserId) -> Result<Option<CartView>>;

    /// Check and apply `command` as one atomic unit.
    async fn apply_cart_command(
        &self,
        user: UserId,
        command: &CartCommand,
    ) -> Result<CartView, CartWriteError>;
}

/// Orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order and empty the user's cart in one transaction.
    ///
    /// Returns `RepositoryError::Conflict` if the order number is taken.
    async fn place_order(&self, order: &NewOrder) -> Result<Order>;
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;
    /// Newest first.
    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<Order>>;
    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>>;
}

/// Reviews.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Returns `RepositoryError::Conflict` if the (user, product, order)
    /// triple already has a review.
    async fn insert_review(&self, review: &NewReview) -> Result<Review>;
    async fn review_exists(&self, user: UserId, product: ProductId, order: OrderId)
    -> Result<bool>;
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>>;
    async fn delete_review(&self, id: ReviewId) -> Result<bool>;
    /// Newest first, with reviewer names.
    async fn list_product_reviews(&self, product: ProductId) -> Result<Vec<ReviewView>>;
    /// Newest first, with product names.
    async fn list_user_reviews(&self, user: UserId) -> Result<Vec<ReviewView>>;
    async fn reviewed_pairs(&self, user: UserId) -> Result<HashSet<(ProductId, OrderId)>>;
}

/// Notification feed.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notifications(&self, batch: &[NewNotification]) -> Result<()>;
    /// Newest first.
    async fn list_notifications(&self, user: UserId, limit: i64) -> Result<Vec<Notification>>;
    async fn unread_count(&self, user: UserId) -> Result<i64>;
    /// Only flips notifications owned by `user`.
    async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<()>;
    async fn mark_all_read(&self, user: UserId) -> Result<()>;
}

/// Everything the storefront persists.
#[async_trait]
pub trait Store:
    UserStore + CatalogStore + CartStore + OrderStore + ReviewStore + NotificationStore
{
    /// Check that the backing storage is reachable.
    async fn ping(&self) -> Result<()>;
}
