//! Cart queries.
//!
//! Every write runs in one transaction that locks the cart row first and
//! takes a share lock on the product being checked, so two concurrent adds
//! for the same user serialize and neither can push a line past stock.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgConnection;
use sqlx::types::Json;

use threadline_core::{CartId, CartItemId, Price, ProductId, Size, UserId};

use super::catalog::{PRODUCT_COLUMNS, ProductRow};
use super::{PgStore, non_negative};
use crate::db::{CartStore, CartWriteError, RepositoryError};
use crate::models::cart::plan;
use crate::models::{
    CartChange, CartCommand, CartError, CartItem, CartView, ColorSnapshot, Product,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    product_id: ProductId,
    size: Size,
    color: Option<Json<ColorSnapshot>>,
    quantity: i32,
    price: Price,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            size: row.size,
            color: row.color.map(|c| c.0),
            quantity: non_negative(row.quantity, "cart item quantity")?,
            price: row.price,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_items(
    conn: &mut PgConnection,
    cart: CartId,
) -> Result<Vec<CartItem>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        r"
        SELECT id, product_id, size, color, quantity, price
        FROM cart_items
        WHERE cart_id = $1
        ORDER BY id
        ",
    )
    .bind(cart)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

async fn load_products(
    conn: &mut PgConnection,
    items: &[CartItem],
) -> Result<HashMap<ProductId, Product>, RepositoryError> {
    let ids: Vec<i32> = items.iter().map(|i| i.product_id.as_i32()).collect();
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)"
    ))
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let product = Product::from(row);
            (product.id, product)
        })
        .collect())
}

fn build_view(
    items: Vec<CartItem>,
    products: &HashMap<ProductId, Product>,
) -> Result<CartView, RepositoryError> {
    CartView::build(items, products)
        .map_err(|e| RepositoryError::DataCorruption(format!("cart total: {e}")))
}

async fn write_change(
    conn: &mut PgConnection,
    cart: CartId,
    change: CartChange,
) -> Result<(), sqlx::Error> {
    match change {
        CartChange::Insert(new) => {
            sqlx::query(
                r"
                INSERT INTO cart_items (cart_id, product_id, size, color, quantity, price)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(cart)
            .bind(new.product_id)
            .bind(new.size)
            .bind(new.color.map(Json))
            .bind(i64::from(new.quantity))
            .bind(new.price)
            .execute(&mut *conn)
            .await?;
        }
        CartChange::SetQuantity { item_id, quantity } => {
            sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND cart_id = $2")
                .bind(item_id)
                .bind(cart)
                .bind(i64::from(quantity))
                .execute(&mut *conn)
                .await?;
        }
        CartChange::Remove(item_id) => {
            sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
                .bind(item_id)
                .bind(cart)
                .execute(&mut *conn)
                .await?;
        }
        CartChange::Clear => {
            sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
                .bind(cart)
                .execute(&mut *conn)
                .await?;
        }
    }

    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
        .bind(cart)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Empty `user`'s cart inside an existing transaction.
pub(super) async fn clear_cart(conn: &mut PgConnection, user: UserId) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        DELETE FROM cart_items
        WHERE cart_id = (SELECT id FROM carts WHERE user_id = $1)
        ",
    )
    .bind(user)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE user_id = $1")
        .bind(user)
        .execute(conn)
        .await?;

    Ok(())
}

// =============================================================================
// Queries
// =============================================================================

#[async_trait]
impl CartStore for PgStore {
    async fn get_cart(&self, user: UserId) -> Result<Option<CartView>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let cart = sqlx::query_scalar::<_, CartId>("SELECT id FROM carts WHERE user_id = $1")
            .bind(user)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(cart) = cart else {
            return Ok(None);
        };

        let items = load_items(&mut conn, cart).await?;
        let products = load_products(&mut conn, &items).await?;
        build_view(items, &products).map(Some)
    }

    async fn apply_cart_command(
        &self,
        user: UserId,
        command: &CartCommand,
    ) -> Result<CartView, CartWriteError> {
        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query_scalar::<_, CartId>("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user)
                .fetch_optional(&mut *tx)
                .await?;

        let cart = match existing {
            Some(cart) => cart,
            None if command.creates_cart() => {
                // Upsert so a concurrent first add waits on the same row.
                sqlx::query_scalar::<_, CartId>(
                    r"
                    INSERT INTO carts (user_id) VALUES ($1)
                    ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
                    RETURNING id
                    ",
                )
                .bind(user)
                .fetch_one(&mut *tx)
                .await?
            }
            None => return Err(CartError::CartNotFound.into()),
        };

        let items = load_items(&mut tx, cart).await?;

        let product = match command.product_for(&items) {
            Some(product_id) => sqlx::query_as::<_, ProductRow>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 FOR SHARE"
            ))
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(Product::from),
            None => None,
        };

        let change = plan(&items, command, product.as_ref())?;
        write_change(&mut tx, cart, change).await?;

        let items = load_items(&mut tx, cart).await?;
        let products = load_products(&mut tx, &items).await?;
        tx.commit().await?;

        Ok(build_view(items, &products)?)
    }
}
