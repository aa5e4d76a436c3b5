//! Order queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use threadline_core::{OrderId, OrderStatus, PaymentMethod, Price, UserId};

use super::carts::clear_cart;
use super::{PgStore, unique_violation};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{CustomerInfo, NewOrder, Order, OrderItem, OrderScope};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    total: Price,
    status: OrderStatus,
    payment_method: PaymentMethod,
    customer_info: Json<CustomerInfo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            items: row.items.0,
            total: row.total,
            status: row.status,
            payment_method: row.payment_method,
            customer_info: row.customer_info.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, items, total, status, payment_method, \
     customer_info, created_at, updated_at";

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (order_number, user_id, items, total, customer_info)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.total)
        .bind(Json(&order.customer_info))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "order number"))?;

        clear_cart(&mut tx, order.user_id).await?;
        tx.commit().await?;

        Ok(row.into())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_orders(&self, scope: OrderScope) -> Result<Vec<Order>, RepositoryError> {
        let user = match scope {
            OrderScope::All => None,
            OrderScope::Customer(user) => Some(user),
        };
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE $1::int IS NULL OR user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
