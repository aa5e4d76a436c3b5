//! Cart operations.
//!
//! The stock decision and the write happen inside the store as one atomic
//! step; this service only shapes requests into [`CartCommand`]s.

use tracing::instrument;

use threadline_core::{CartItemId, ProductId, Size, UserId};

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{CartCommand, CartView, ColorSnapshot};

pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The caller's cart. Anonymous callers and users without a cart get an
    /// empty one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cart cannot be loaded.
    pub async fn get_cart(&self, user: Option<UserId>) -> Result<CartView> {
        let Some(user) = user else {
            return Ok(CartView::empty());
        };
        Ok(self
            .store
            .get_cart(user)
            .await?
            .unwrap_or_else(CartView::empty))
    }

    /// Add `quantity` (default 1) of a product size and color.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a quantity below 1 or a size the
    /// product does not offer, `AppError::NotFound` for an unknown product and
    /// `AppError::StockExceeded` when the line would exceed stock.
    #[instrument(skip(self, color))]
    pub async fn add_item(
        &self,
        user: UserId,
        product_id: ProductId,
        size: Size,
        color: Option<ColorSnapshot>,
        quantity: Option<i64>,
    ) -> Result<CartView> {
        let quantity = quantity.unwrap_or(1);
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| AppError::Validation("Quantity must be at least 1".to_string()))?;

        let command = CartCommand::Add {
            product_id,
            size,
            color,
            quantity,
        };
        Ok(self.store.apply_cart_command(user, &command).await?)
    }

    /// Replace a line's quantity; zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the cart or item is missing and
    /// `AppError::StockExceeded` when the quantity exceeds stock.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartView> {
        let command = CartCommand::Update { item_id, quantity };
        Ok(self.store.apply_cart_command(user, &command).await?)
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user: UserId, item_id: CartItemId) -> Result<CartView> {
        let command = CartCommand::Remove { item_id };
        Ok(self.store.apply_cart_command(user, &command).await?)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no cart.
    #[instrument(skip(self))]
    pub async fn clear(&self, user: UserId) -> Result<CartView> {
        Ok(self
            .store
            .apply_cart_command(user, &CartCommand::Clear)
            .await?)
    }
}
