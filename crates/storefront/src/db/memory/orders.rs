use async_trait::async_trait;
use chrono::Utc;

use threadline_core::{OrderId, OrderStatus, PaymentMethod};

use super::MemoryStore;
use crate::db::{OrderStore, RepositoryError};
use crate::models::{NewOrder, Order, OrderScope};

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let mut state = self.state.write().await;
        if state
            .orders
            .values()
            .any(|o| o.order_number == new.order_number)
        {
            return Err(RepositoryError::Conflict(
                "order number already exists".to_owned(),
            ));
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(state.next_id()),
            order_number: new.order_number.clone(),
            user_id: new.user_id,
            items: new.items.clone(),
            total: new.total,
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            customer_info: new.customer_info.clone(),
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(order.id, order.clone());
        if let Some(items) = state.carts.get_mut(&new.user_id) {
            items.clear();
        }
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .rev()
            .filter(|o| scope.includes(o))
            .cloned()
            .collect())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.orders.get_mut(&id).map(|o| {
            o.status = status;
            o.updated_at = Utc::now();
            o.clone()
        }))
    }
}
