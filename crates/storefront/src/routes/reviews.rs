//! Review route handlers. Every endpoint requires a signed-in user.

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};

use threadline_core::{ProductId, ReviewId};

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireAuth;
use crate::models::{EligibleProduct, Review, ReviewRequest, ReviewView};
use crate::services::ReviewService;
use crate::state::AppState;

/// Build the reviews router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(for_product).post(submit))
        .route("/reviews/{id}", delete(remove))
        .route("/reviews/user", get(mine))
        .route("/reviews/eligible-products", get(eligible))
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Reviews of `?product_id=`, newest first.
///
/// # Errors
///
/// Returns 400 without a product id.
pub async fn for_product(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    AppQuery(query): AppQuery<ProductQuery>,
) -> Result<Json<Vec<ReviewView>>> {
    let product = query
        .product_id
        .ok_or_else(|| AppError::Validation("Product ID is required".to_string()))?;
    let reviews = ReviewService::new(state.store())
        .for_product(product)
        .await?;
    Ok(Json(reviews))
}

/// Review a product from a delivered order.
///
/// # Errors
///
/// Returns 400 when the order is not eligible, the review exists or a field
/// is invalid.
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<ReviewRequest>,
) -> Result<Json<Review>> {
    let review = ReviewService::new(state.store())
        .submit(user.id, body)
        .await?;
    Ok(Json(review))
}

/// Delete one of the caller's reviews.
///
/// # Errors
///
/// Returns 404 for an unknown review and 401 for someone else's.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<ReviewId>,
) -> Result<Json<MessageResponse>> {
    ReviewService::new(state.store()).delete(user.id, id).await?;
    Ok(Json(MessageResponse {
        message: "Review deleted successfully",
    }))
}

/// The caller's reviews.
///
/// # Errors
///
/// Returns 401 without a session user.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ReviewView>>> {
    let reviews = ReviewService::new(state.store()).for_user(user.id).await?;
    Ok(Json(reviews))
}

/// Products from delivered orders still waiting for a review.
///
/// # Errors
///
/// Returns 401 without a session user.
pub async fn eligible(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<EligibleProduct>>> {
    let products = ReviewService::new(state.store())
        .eligible_products(user.id)
        .await?;
    Ok(Json(products))
}
