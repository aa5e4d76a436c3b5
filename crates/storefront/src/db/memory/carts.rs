use async_trait::async_trait;

use threadline_core::{CartItemId, UserId};

use super::{MemoryState, MemoryStore};
use crate::db::{CartStore, CartWriteError, RepositoryError};
use crate::models::cart::plan;
use crate::models::{CartCommand, CartError, CartItem, CartView};

fn view(state: &MemoryState, items: &[CartItem]) -> Result<CartView, RepositoryError> {
    let products = state.products_for(items.iter().map(|i| &i.product_id));
    CartView::build(items.to_vec(), &products)
        .map_err(|e| RepositoryError::DataCorruption(format!("cart total: {e}")))
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_cart(&self, user: UserId) -> Result<Option<CartView>, RepositoryError> {
        let state = self.state.read().await;
        state
            .carts
            .get(&user)
            .map(|items| view(&state, items))
            .transpose()
    }

    async fn apply_cart_command(
        &self,
        user: UserId,
        command: &CartCommand,
    ) -> Result<CartView, CartWriteError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let change = {
            let items = match state.carts.get(&user) {
                Some(items) => items.as_slice(),
                None if command.creates_cart() => &[],
                None => return Err(CartError::CartNotFound.into()),
            };
            let product = command
                .product_for(items)
                .and_then(|id| state.products.get(&id));
            plan(items, command, product)?
        };

        let MemoryState { carts, last_id, .. } = &mut *state;
        change.apply(carts.entry(user).or_default(), || {
            *last_id += 1;
            CartItemId::new(*last_id)
        });

        let items = state.carts.get(&user).map(Vec::as_slice).unwrap_or_default();
        Ok(view(state, items)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use threadline_core::{ProductId, Size};

    use super::*;
    use crate::db::memory::tests::seed_product;

    fn add(product_id: ProductId, quantity: u32) -> CartCommand {
        CartCommand::Add {
            product_id,
            size: Size::M,
            color: None,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_rejected_add_leaves_cart_unchanged() {
        let store = MemoryStore::new();
        let user = UserId::new(100);
        let product = seed_product(&store, "SHI-0001", &[(Size::M, 3)]).await;

        store
            .apply_cart_command(user, &add(product.id, 2))
            .await
            .unwrap();
        let err = store
            .apply_cart_command(user, &add(product.id, 2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CartWriteError::Rejected(CartError::StockExceeded {
                available: 3,
                in_cart: 2,
                ..
            })
        ));

        let cart = store.get_cart(user).await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].item.quantity, 2);
    }

    #[tokio::test]
    async fn test_commands_other_than_add_need_a_cart() {
        let store = MemoryStore::new();
        let err = store
            .apply_cart_command(UserId::new(1), &CartCommand::Clear)
            .await
            .unwrap_err();
        assert!(matches!(err, CartWriteError::Rejected(CartError::CartNotFound)));
        assert!(store.get_cart(UserId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_adds_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::new(100);
        let product_id = seed_product(&store, "SHI-0001", &[(Size::M, 3)]).await.id;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.apply_cart_command(user, &add(product_id, 1)).await })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 3);
        let cart = store.get_cart(user).await.unwrap().unwrap();
        assert_eq!(cart.item_count, 3);
    }
}
