//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use threadline_core::{OrderId, ProductId, ReviewId, UserId};

use super::catalog::Product;

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub rating: i16,
    pub title: Option<String>,
    pub comment: Option<String>,
    /// Set once the delivered order has been checked; always true today.
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub rating: i16,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub rating: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Review with the reviewer's name (product page) or the product's name
/// (account page).
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub reviewer_first_name: Option<String>,
    pub reviewer_last_name: Option<String>,
    pub product_name: Option<String>,
}

/// The order a product can still be reviewed against.
#[derive(Debug, Clone, Serialize)]
pub struct EligibleOrder {
    pub id: OrderId,
    pub order_number: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibleProduct {
    pub product: Product,
    pub order: EligibleOrder,
}
