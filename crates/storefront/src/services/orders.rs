//! Checkout and order status.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use tracing::instrument;

use threadline_core::{NotificationKind, OrderId, OrderStatus, ProductId, RelatedKind, UserId};

use super::notifications::{NotificationContent, NotificationService};
use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result};
use crate::models::{
    CurrentUser, CustomerInfo, CustomerInfoInput, NewOrder, Order, OrderScope, OrderView,
    PlaceOrderRequest, RelatedRef,
};

/// Attempts at finding an unused order number.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// `ORD-<unix millis>-<0..999>`.
fn generate_order_number() -> String {
    let suffix: u16 = rand::rng().random_range(0..1000);
    format!("ORD-{}-{suffix}", Utc::now().timestamp_millis())
}

fn customer_info(input: Option<CustomerInfoInput>, notes: Option<String>) -> Result<CustomerInfo> {
    let input = input.unwrap_or_default();
    let field = |value: Option<String>| {
        value
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };

    match (
        field(input.full_name),
        field(input.phone_number),
        field(input.address),
    ) {
        (Some(full_name), Some(phone_number), Some(address)) => Ok(CustomerInfo {
            full_name,
            phone_number,
            address,
            notes: notes.unwrap_or_default(),
        }),
        _ => Err(AppError::Validation(
            "Full name, phone number, and address are required".to_string(),
        )),
    }
}

pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Turn the submitted cart snapshot into a pending order and empty the
    /// user's cart. Items and total are stored as submitted.
    ///
    /// Every admin is notified; a failed notification is logged and does not
    /// undo the order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty item list, an item with a
    /// zero quantity or missing contact fields.
    #[instrument(skip(self, request), fields(user_id = %user))]
    pub async fn place_order(&self, user: UserId, request: PlaceOrderRequest) -> Result<OrderView> {
        if request.items.is_empty() {
            return Err(AppError::Validation("Cart is empty".to_string()));
        }
        if request.items.iter().any(|item| item.quantity == 0) {
            return Err(AppError::Validation(
                "Order items must have a quantity of at least 1".to_string(),
            ));
        }
        let total = request
            .total
            .ok_or_else(|| AppError::Validation("Order total is required".to_string()))?;
        if !total.is_storable() || request.items.iter().any(|item| !item.price.is_storable()) {
            return Err(AppError::Validation("Order total is too large".to_string()));
        }
        let customer_info = customer_info(request.customer_info, request.notes)?;

        let mut new_order = NewOrder {
            order_number: generate_order_number(),
            user_id: user,
            items: request.items,
            total,
            customer_info,
        };

        let mut attempt = 1;
        let order = loop {
            match self.store.place_order(&new_order).await {
                Ok(order) => break order,
                Err(RepositoryError::Conflict(_)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    attempt += 1;
                    new_order.order_number = generate_order_number();
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(order_id = %order.id, order_number = %order.order_number, "Order placed");
        self.announce_new_order(&order).await;

        self.view(order, false).await
    }

    /// Only admins may change an order's status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` for everyone else.
    pub fn authorize_status_change(actor: &CurrentUser) -> Result<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(AppError::Unauthorized("Unauthorized".to_string()))
        }
    }

    /// Replace an order's status. Any status may follow any other; moving
    /// backwards is logged.
    ///
    /// The order's owner is notified; a failed notification is logged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` unless `actor` is an admin and
    /// `AppError::NotFound` for an unknown order.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn update_status(
        &self,
        actor: &CurrentUser,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderView> {
        Self::authorize_status_change(actor)?;

        let current = self
            .store
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        if current.status.is_regression_to(status) {
            tracing::warn!(
                order_id = %id,
                from = %current.status,
                to = %status,
                "Order status moved backwards"
            );
        }

        let order = self
            .store
            .set_order_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        let notice = NotificationService::new(self.store)
            .notify(
                order.user_id,
                NotificationContent {
                    kind: NotificationKind::OrderStatus,
                    title: "Order status updated".to_string(),
                    message: format!("Your order {} is now {}", order.order_number, status),
                    related: Some(RelatedRef {
                        kind: RelatedKind::Order,
                        id: order.id.as_i32(),
                    }),
                },
            )
            .await;
        if let Err(e) = notice {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to notify customer");
        }

        self.view(order, true).await
    }

    /// Admins see every order with the customer resolved; everyone else sees
    /// their own. Newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn list_orders(&self, actor: &CurrentUser) -> Result<Vec<OrderView>> {
        let scope = if actor.is_admin() {
            OrderScope::All
        } else {
            OrderScope::Customer(actor.id)
        };
        let orders = self.store.list_orders(scope).await?;

        let product_ids: Vec<ProductId> = orders
            .iter()
            .flat_map(|o| o.items.iter().map(|i| i.product_id))
            .collect();
        let products = self.store.products_by_ids(&product_ids).await?;

        let customers = if actor.is_admin() {
            let user_ids: Vec<UserId> = orders.iter().map(|o| o.user_id).collect();
            self.store.user_summaries(&user_ids).await?
        } else {
            HashMap::new()
        };

        Ok(orders
            .into_iter()
            .map(|order| {
                let customer = customers.get(&order.user_id).cloned();
                OrderView::build(order, &products, customer)
            })
            .collect())
    }

    async fn view(&self, order: Order, with_customer: bool) -> Result<OrderView> {
        let product_ids: Vec<ProductId> = order.items.iter().map(|i| i.product_id).collect();
        let products = self.store.products_by_ids(&product_ids).await?;
        let customer = if with_customer {
            self.store
                .user_summaries(&[order.user_id])
                .await?
                .remove(&order.user_id)
        } else {
            None
        };
        Ok(OrderView::build(order, &products, customer))
    }

    async fn announce_new_order(&self, order: &Order) {
        let result = NotificationService::new(self.store)
            .notify_admins(NotificationContent {
                kind: NotificationKind::NewOrder,
                title: "New order".to_string(),
                message: format!(
                    "Order {} was placed for {}",
                    order.order_number, order.total
                ),
                related: Some(RelatedRef {
                    kind: RelatedKind::Order,
                    id: order.id.as_i32(),
                }),
            })
            .await;

        if let Err(e) = result {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to notify admins");
        }
    }
}
