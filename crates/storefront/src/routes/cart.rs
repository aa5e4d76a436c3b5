//! Cart route handlers.
//!
//! Every mutation answers with the whole cart so clients can re-render from
//! one response.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde::{Deserialize, Serialize};

use threadline_core::{CartItemId, ProductId, Size};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{AppJson, AppQuery};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CartView, ColorSnapshot};
use crate::services::CartService;
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/cart",
        get(show).post(add).put(update).delete(remove),
    )
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<ProductId>,
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<ColorSnapshot>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub item_id: Option<CartItemId>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub item_id: Option<CartItemId>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub cart: CartView,
}

// =============================================================================
// Handlers
// =============================================================================

/// The caller's cart; anonymous callers get an empty one.
///
/// # Errors
///
/// Returns 500 if the cart cannot be loaded.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.store())
        .get_cart(user.map(|u| u.id))
        .await?;
    Ok(Json(cart))
}

/// Add a product size to the cart, merging with an identical line.
///
/// # Errors
///
/// Returns 400 for missing fields, unknown sizes or insufficient stock and
/// 404 for an unknown product.
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<AddItemRequest>,
) -> Result<Json<CartResponse>> {
    let (Some(product_id), Some(size)) = (body.product_id, body.size) else {
        return Err(AppError::Validation(
            "Product ID and size are required".to_string(),
        ));
    };
    let size: Size = size
        .parse()
        .map_err(|e: threadline_core::SizeError| AppError::Validation(e.to_string()))?;

    let cart = CartService::new(state.store())
        .add_item(user.id, product_id, size, body.color, body.quantity)
        .await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", &product_id.to_string()), ("size", size.as_str())]),
    );

    Ok(Json(CartResponse {
        message: "Item added to cart",
        cart,
    }))
}

/// Set a line's quantity; zero or less removes it.
///
/// # Errors
///
/// Returns 400 for missing fields or insufficient stock and 404 when the cart
/// or line does not exist.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<UpdateItemRequest>,
) -> Result<Json<CartResponse>> {
    let (Some(item_id), Some(quantity)) = (body.item_id, body.quantity) else {
        return Err(AppError::Validation(
            "Item ID and quantity are required".to_string(),
        ));
    };

    let cart = CartService::new(state.store())
        .update_item(user.id, item_id, quantity)
        .await?;
    Ok(Json(CartResponse {
        message: "Cart updated",
        cart,
    }))
}

/// Remove one line with `?item_id=`, or empty the cart.
///
/// # Errors
///
/// Returns 404 when the user has no cart.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppQuery(query): AppQuery<RemoveQuery>,
) -> Result<Json<CartResponse>> {
    let service = CartService::new(state.store());
    let (cart, message) = match query.item_id {
        Some(item_id) => (
            service.remove_item(user.id, item_id).await?,
            "Item removed from cart",
        ),
        None => (service.clear(user.id).await?, "Cart cleared"),
    };
    Ok(Json(CartResponse { message, cart }))
}
