//! Shopping cart types and the stock-check planner.
//!
//! Every cart mutation is described as a [`CartCommand`]. A store loads the
//! cart (and the product the command touches) under a lock, asks [`plan`]
//! for the single [`CartChange`] to make, and writes it before releasing the
//! lock. The stock decision therefore sees the same state the write lands on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use threadline_core::{CartItemId, Price, PriceError, ProductId, Size};

use super::catalog::Product;

/// Color chosen when the item was added, copied from the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSnapshot {
    pub name: String,
    #[serde(default)]
    pub hex: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub size: Size,
    pub color: Option<ColorSnapshot>,
    pub quantity: u32,
    /// Unit price captured when the line was created.
    pub price: Price,
}

impl CartItem {
    /// Lines merge when product, size and color name all match.
    fn is_same_line(&self, product_id: ProductId, size: Size, color: Option<&ColorSnapshot>) -> bool {
        self.product_id == product_id
            && self.size == size
            && self.color.as_ref().map(|c| c.name.as_str()) == color.map(|c| c.name.as_str())
    }
}

/// A requested cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    Add {
        product_id: ProductId,
        size: Size,
        color: Option<ColorSnapshot>,
        quantity: u32,
    },
    /// A quantity of zero or less removes the line.
    Update { item_id: CartItemId, quantity: i64 },
    Remove { item_id: CartItemId },
    Clear,
}

impl CartCommand {
    /// Only adding may create the cart; every other command needs one.
    #[must_use]
    pub const fn creates_cart(&self) -> bool {
        matches!(self, Self::Add { .. })
    }

    /// The product whose stock the command must be checked against.
    #[must_use]
    pub fn product_for(&self, items: &[CartItem]) -> Option<ProductId> {
        match self {
            Self::Add { product_id, .. } => Some(*product_id),
            Self::Update { item_id, .. } => items
                .iter()
                .find(|i| i.id == *item_id)
                .map(|i| i.product_id),
            Self::Remove { .. } | Self::Clear => None,
        }
    }
}

/// New line to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub size: Size,
    pub color: Option<ColorSnapshot>,
    pub quantity: u32,
    pub price: Price,
}

/// The single write a command resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    Insert(NewCartItem),
    SetQuantity { item_id: CartItemId, quantity: u32 },
    Remove(CartItemId),
    Clear,
}

impl CartChange {
    /// Apply the change to an in-memory line list.
    pub fn apply(self, items: &mut Vec<CartItem>, next_id: impl FnOnce() -> CartItemId) {
        match self {
            Self::Insert(new) => items.push(CartItem {
                id: next_id(),
                product_id: new.product_id,
                size: new.size,
                color: new.color,
                quantity: new.quantity,
                price: new.price,
            }),
            Self::SetQuantity { item_id, quantity } => {
                if let Some(item) = items.iter_mut().find(|i| i.id == item_id) {
                    item.quantity = quantity;
                }
            }
            Self::Remove(item_id) => items.retain(|i| i.id != item_id),
            Self::Clear => items.clear(),
        }
    }
}

/// Cart operation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Cart not found")]
    CartNotFound,

    #[error("Item not found in cart")]
    ItemNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Size {0} is not available for this product")]
    SizeUnavailable(Size),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Quantity is too large")]
    QuantityTooLarge,

    #[error("Only {available} in stock for size {size} ({in_cart} already in cart)")]
    StockExceeded {
        size: Size,
        available: u32,
        in_cart: u32,
    },
}

/// Decide the write for `command` against the current cart lines.
///
/// `product` is the product named by [`CartCommand::product_for`], or `None`
/// when it does not exist.
///
/// # Errors
///
/// Returns a [`CartError`] when the command is rejected; the cart must then be
/// left as it is.
pub fn plan(
    items: &[CartItem],
    command: &CartCommand,
    product: Option<&Product>,
) -> Result<CartChange, CartError> {
    match command {
        CartCommand::Add {
            product_id,
            size,
            color,
            quantity,
        } => {
            if *quantity == 0 {
                return Err(CartError::InvalidQuantity);
            }
            let product = product.ok_or(CartError::ProductNotFound)?;
            let available = product
                .stock_for(*size)
                .ok_or(CartError::SizeUnavailable(*size))?;

            let existing = items
                .iter()
                .find(|i| i.is_same_line(*product_id, *size, color.as_ref()));
            let in_cart = existing.map_or(0, |i| i.quantity);
            let wanted = match in_cart.checked_add(*quantity) {
                Some(wanted) if wanted <= available => wanted,
                _ => {
                    return Err(CartError::StockExceeded {
                        size: *size,
                        available,
                        in_cart,
                    });
                }
            };

            Ok(match existing {
                Some(item) => CartChange::SetQuantity {
                    item_id: item.id,
                    quantity: wanted,
                },
                None => CartChange::Insert(NewCartItem {
                    product_id: *product_id,
                    size: *size,
                    color: color.clone(),
                    quantity: *quantity,
                    price: product.price,
                }),
            })
        }
        CartCommand::Update { item_id, quantity } => {
            let item = items
                .iter()
                .find(|i| i.id == *item_id)
                .ok_or(CartError::ItemNotFound)?;

            // A product that has since disappeared, or dropped the size, no
            // longer constrains the line.
            if let Some(available) = product.and_then(|p| p.stock_for(item.size))
                && *quantity > i64::from(available)
            {
                return Err(CartError::StockExceeded {
                    size: item.size,
                    available,
                    in_cart: item.quantity,
                });
            }

            if *quantity <= 0 {
                return Ok(CartChange::Remove(*item_id));
            }
            let quantity = u32::try_from(*quantity).map_err(|_| CartError::QuantityTooLarge)?;
            Ok(CartChange::SetQuantity {
                item_id: *item_id,
                quantity,
            })
        }
        CartCommand::Remove { item_id } => Ok(CartChange::Remove(*item_id)),
        CartCommand::Clear => Ok(CartChange::Clear),
    }
}

// =============================================================================
// Read model
// =============================================================================

/// Cart line with its product resolved.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Option<Product>,
}

/// A cart as returned to clients. Totals are always derived from the lines.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: Price,
    pub item_count: u32,
}

impl CartView {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: Price::ZERO,
            item_count: 0,
        }
    }

    /// Build the view from stored lines and the products they reference.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if a line total does not fit a decimal.
    pub fn build(
        items: Vec<CartItem>,
        products: &HashMap<ProductId, Product>,
    ) -> Result<Self, PriceError> {
        let mut total = Price::ZERO;
        let mut item_count: u32 = 0;
        for item in &items {
            total = total.checked_add(item.price.checked_mul(item.quantity)?)?;
            item_count = item_count.saturating_add(item.quantity);
        }

        let items = items
            .into_iter()
            .map(|item| CartLine {
                product: products.get(&item.product_id).cloned(),
                item,
            })
            .collect();

        Ok(Self {
            items,
            total,
            item_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use threadline_core::CategoryId;

    use super::*;
    use crate::models::catalog::{ColorVariant, SizeStock};

    fn product(stock: &[(Size, u32)]) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Linen Shirt".into(),
            description: "Breathable".into(),
            price: Price::new(Decimal::new(2500, 2)).unwrap(),
            original_price: None,
            category_id: CategoryId::new(1),
            sub_category_id: None,
            collection_id: None,
            sizes: stock
                .iter()
                .map(|&(size, stock)| SizeStock { size, stock })
                .collect(),
            colors: vec![ColorVariant {
                name: "Sand".into(),
                hex: "#c2b280".into(),
                images: vec!["sand.jpg".into()],
            }],
            featured_image: Some("sand.jpg".into()),
            likes: 0,
            tags: vec![],
            is_active: true,
            is_featured: false,
            sku: "SHI-1234".into(),
            seo_url: "linen-shirt".into(),
            meta_title: None,
            meta_description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sand() -> Option<ColorSnapshot> {
        Some(ColorSnapshot {
            name: "Sand".into(),
            hex: "#c2b280".into(),
            images: vec![],
        })
    }

    fn line(id: i32, size: Size, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(1),
            size,
            color: sand(),
            quantity,
            price: Price::new(Decimal::new(2500, 2)).unwrap(),
        }
    }

    fn add(size: Size, quantity: u32) -> CartCommand {
        CartCommand::Add {
            product_id: ProductId::new(1),
            size,
            color: sand(),
            quantity,
        }
    }

    #[test]
    fn test_add_over_stock_reports_available_and_in_cart() {
        let p = product(&[(Size::M, 3)]);
        let items = [line(1, Size::M, 2)];

        let err = plan(&items, &add(Size::M, 2), Some(&p)).unwrap_err();
        assert_eq!(
            err,
            CartError::StockExceeded {
                size: Size::M,
                available: 3,
                in_cart: 2
            }
        );
        assert!(err.to_string().contains("2 already in cart"));
    }

    #[test]
    fn test_add_merges_matching_line() {
        let p = product(&[(Size::M, 5)]);
        let items = [line(1, Size::M, 2)];

        let change = plan(&items, &add(Size::M, 3), Some(&p)).unwrap();
        assert_eq!(
            change,
            CartChange::SetQuantity {
                item_id: CartItemId::new(1),
                quantity: 5
            }
        );
    }

    #[test]
    fn test_add_different_color_is_new_line() {
        let p = product(&[(Size::M, 5)]);
        let items = [line(1, Size::M, 2)];
        let command = CartCommand::Add {
            product_id: ProductId::new(1),
            size: Size::M,
            color: None,
            quantity: 1,
        };

        match plan(&items, &command, Some(&p)).unwrap() {
            CartChange::Insert(new) => {
                assert_eq!(new.quantity, 1);
                assert_eq!(new.price, p.price);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn test_add_checks_requested_alone_for_new_line() {
        let p = product(&[(Size::L, 1)]);
        let err = plan(&[], &add(Size::L, 2), Some(&p)).unwrap_err();
        assert!(matches!(
            err,
            CartError::StockExceeded {
                available: 1,
                in_cart: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_add_rejects_missing_size_product_and_zero_quantity() {
        let p = product(&[(Size::M, 3)]);
        assert_eq!(
            plan(&[], &add(Size::Xl, 1), Some(&p)),
            Err(CartError::SizeUnavailable(Size::Xl))
        );
        assert_eq!(
            plan(&[], &add(Size::M, 1), None),
            Err(CartError::ProductNotFound)
        );
        assert_eq!(
            plan(&[], &add(Size::M, 0), Some(&p)),
            Err(CartError::InvalidQuantity)
        );
    }

    #[test]
    fn test_update_non_positive_removes() {
        let p = product(&[(Size::M, 3)]);
        let items = [line(7, Size::M, 2)];
        for quantity in [0, -4] {
            let command = CartCommand::Update {
                item_id: CartItemId::new(7),
                quantity,
            };
            assert_eq!(
                plan(&items, &command, Some(&p)).unwrap(),
                CartChange::Remove(CartItemId::new(7))
            );
        }
    }

    #[test]
    fn test_update_replaces_within_stock_and_rejects_above() {
        let p = product(&[(Size::M, 3)]);
        let items = [line(7, Size::M, 1)];

        let ok = CartCommand::Update {
            item_id: CartItemId::new(7),
            quantity: 3,
        };
        assert_eq!(
            plan(&items, &ok, Some(&p)).unwrap(),
            CartChange::SetQuantity {
                item_id: CartItemId::new(7),
                quantity: 3
            }
        );

        let too_many = CartCommand::Update {
            item_id: CartItemId::new(7),
            quantity: 4,
        };
        assert!(matches!(
            plan(&items, &too_many, Some(&p)),
            Err(CartError::StockExceeded { available: 3, .. })
        ));
    }

    #[test]
    fn test_update_unknown_item() {
        let command = CartCommand::Update {
            item_id: CartItemId::new(99),
            quantity: 1,
        };
        assert_eq!(plan(&[], &command, None), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_update_without_product_skips_stock_check() {
        let items = [line(7, Size::M, 1)];
        let command = CartCommand::Update {
            item_id: CartItemId::new(7),
            quantity: 50,
        };
        assert!(plan(&items, &command, None).is_ok());
    }

    #[test]
    fn test_apply_and_build_view() {
        let p = product(&[(Size::M, 10)]);
        let mut items = vec![line(1, Size::M, 2)];
        CartChange::Insert(NewCartItem {
            product_id: p.id,
            size: Size::S,
            color: None,
            quantity: 1,
            price: Price::new(Decimal::new(1000, 2)).unwrap(),
        })
        .apply(&mut items, || CartItemId::new(2));
        CartChange::SetQuantity {
            item_id: CartItemId::new(1),
            quantity: 3,
        }
        .apply(&mut items, || unreachable!());

        let products = HashMap::from([(p.id, p)]);
        let view = CartView::build(items, &products).unwrap();
        assert_eq!(view.item_count, 4);
        assert_eq!(view.total, Price::new(Decimal::new(8500, 2)).unwrap());
        assert!(view.items.iter().all(|l| l.product.is_some()));
    }

    #[test]
    fn test_update_beyond_u32_without_product() {
        let items = [line(7, Size::M, 1)];
        let command = CartCommand::Update {
            item_id: CartItemId::new(7),
            quantity: i64::from(u32::MAX) + 1,
        };
        assert_eq!(plan(&items, &command, None), Err(CartError::QuantityTooLarge));
        assert_eq!(CartError::QuantityTooLarge.to_string(), "Quantity is too large");
    }

    #[test]
    fn test_build_reports_total_overflow() {
        let mut first = line(1, Size::M, 1);
        first.price = Price::new(Decimal::MAX).unwrap();
        let mut second = line(2, Size::L, 1);
        second.price = Price::new(Decimal::MAX).unwrap();

        let result = CartView::build(vec![first, second], &HashMap::new());
        assert!(matches!(result, Err(PriceError::Overflow)));
    }

    #[test]
    fn test_command_product_lookup() {
        let items = [line(3, Size::M, 1)];
        assert_eq!(
            CartCommand::Update {
                item_id: CartItemId::new(3),
                quantity: 1
            }
            .product_for(&items),
            Some(ProductId::new(1))
        );
        assert_eq!(CartCommand::Clear.product_for(&items), None);
        assert!(!CartCommand::Clear.creates_cart());
    }
}
