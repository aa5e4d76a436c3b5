//! Order records and their read model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use threadline_core::{OrderId, OrderStatus, PaymentMethod, Price, ProductId, Size, UserId};

use super::catalog::Product;
use super::user::UserSummary;

/// Color recorded on an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderColor {
    pub name: String,
    #[serde(default)]
    pub hex: String,
}

/// An immutable order line, copied from the submitted cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub size: Size,
    #[serde(default)]
    pub color: Option<OrderColor>,
    pub quantity: u32,
    pub price: Price,
}

/// Delivery contact captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Price,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub customer_info: CustomerInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to insert an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Price,
    pub customer_info: CustomerInfo,
}

/// Which orders a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Customer(UserId),
}

impl OrderScope {
    #[must_use]
    pub fn includes(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::Customer(user_id) => order.user_id == *user_id,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Checkout contact fields as submitted. Blank fields are rejected by the
/// order service with a single message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInfoInput {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: Option<Price>,
    #[serde(default)]
    pub customer_info: Option<CustomerInfoInput>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Read model
// =============================================================================

/// Order line with its product resolved.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    /// Present on the admin listing.
    pub customer: Option<UserSummary>,
    pub items: Vec<OrderLine>,
    pub total: Price,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub customer_info: CustomerInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    #[must_use]
    pub fn build(
        order: Order,
        products: &HashMap<ProductId, Product>,
        customer: Option<UserSummary>,
    ) -> Self {
        let items = order
            .items
            .into_iter()
            .map(|item| OrderLine {
                product: products.get(&item.product_id).cloned(),
                item,
            })
            .collect();

        Self {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            customer,
            items,
            total: order.total,
            status: order.status,
            payment_method: order.payment_method,
            customer_info: order.customer_info,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
