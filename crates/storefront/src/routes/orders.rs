//! Order route handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use threadline_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireAuth;
use crate::models::{OrderView, PlaceOrderRequest};
use crate::services::OrderService;
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list).post(place))
        .route("/orders/{id}", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: &'static str,
    pub order: OrderView,
}

/// Admins get every order; customers get their own.
///
/// # Errors
///
/// Returns 401 without a session user.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderService::new(state.store()).list_orders(&user).await?;
    Ok(Json(orders))
}

/// Check out the submitted cart snapshot.
///
/// # Errors
///
/// Returns 400 for an empty cart or missing contact details.
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<PlaceOrderRequest>,
) -> Result<Json<OrderResponse>> {
    let order = OrderService::new(state.store())
        .place_order(user.id, body)
        .await?;
    add_breadcrumb(
        "orders",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    Ok(Json(OrderResponse {
        message: "Order created successfully",
        order,
    }))
}

/// Admin-only status change.
///
/// # Errors
///
/// Returns 401 for non-admins, 400 for a missing or unknown status and 404
/// for an unknown order.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<OrderId>,
    AppJson(body): AppJson<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>> {
    OrderService::authorize_status_change(&user)?;

    let status: OrderStatus = body
        .status
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Status is required".to_string()))?
        .parse()
        .map_err(AppError::Validation)?;

    let order = OrderService::new(state.store())
        .update_status(&user, id, status)
        .await?;
    Ok(Json(OrderResponse {
        message: "Order status updated successfully",
        order,
    }))
}
