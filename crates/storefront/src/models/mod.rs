//! Domain models for the storefront.
//!
//! Persisted records (`Product`, `Cart`, `Order`, ...) are kept separate from
//! request bodies (`*Input`, `*Request`) and from the joined read models
//! (`*View`) that the JSON handlers return.

pub mod cart;
pub mod catalog;
pub mod notification;
pub mod order;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{
    CartChange, CartCommand, CartError, CartItem, CartLine, CartView, ColorSnapshot, NewCartItem,
};
pub use catalog::{
    CatalogRef, Category, CategoryInput, CategoryView, Collection, CollectionFilter,
    CollectionInput, ColorVariant, DEFAULT_SEARCH_LIMIT, LikeOutcome, MAX_SEARCH_LIMIT,
    NewProduct, Product, ProductDraft, ProductFilter, ProductInput, ProductSearch, ProductSort,
    ProductView, SizeStock, SubCategory, SubCategoryInput, SubCategoryView,
};
pub use notification::{NewNotification, Notification, NotificationFeed, RelatedRef};
pub use order::{
    CustomerInfo, CustomerInfoInput, NewOrder, Order, OrderColor, OrderItem, OrderLine,
    OrderScope, OrderView, PlaceOrderRequest,
};
pub use review::{EligibleOrder, EligibleProduct, NewReview, Review, ReviewRequest, ReviewView};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, ProfileUpdate, User, UserSummary};
