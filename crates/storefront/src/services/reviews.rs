//! Reviews of delivered order items.

use tracing::instrument;

use threadline_core::{OrderStatus, ProductId, ReviewId, UserId};

use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result};
use crate::models::{
    EligibleOrder, EligibleProduct, NewReview, OrderScope, Review, ReviewRequest, ReviewView,
};

const MAX_TITLE_CHARS: usize = 100;
const MAX_COMMENT_CHARS: usize = 1000;

fn optional_text(value: Option<String>, field: &str, max: usize) -> Result<Option<String>> {
    let Some(value) = value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} cannot be more than {max} characters"
        )));
    }
    Ok(Some(value))
}

pub struct ReviewService<'a> {
    store: &'a dyn Store,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Review a product from one of the user's delivered orders.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidEligibility` unless the order belongs to
    /// `user`, is delivered and contains the product,
    /// `AppError::DuplicateReview` if the triple was already reviewed and
    /// `AppError::Validation` for a rating outside 1-5 or overlong text.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, order_id = %request.order_id))]
    pub async fn submit(&self, user: UserId, request: ReviewRequest) -> Result<Review> {
        let eligible = self
            .store
            .get_order(request.order_id)
            .await?
            .is_some_and(|order| {
                order.user_id == user
                    && order.status == OrderStatus::Delivered
                    && order
                        .items
                        .iter()
                        .any(|item| item.product_id == request.product_id)
            });
        if !eligible {
            return Err(AppError::InvalidEligibility(
                "Order not found or not delivered".to_string(),
            ));
        }

        if self
            .store
            .review_exists(user, request.product_id, request.order_id)
            .await?
        {
            return Err(AppError::DuplicateReview);
        }

        let rating = i16::try_from(request.rating)
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| AppError::Validation("Rating must be between 1 and 5".to_string()))?;
        let title = optional_text(request.title, "Title", MAX_TITLE_CHARS)?;
        let comment = optional_text(request.comment, "Comment", MAX_COMMENT_CHARS)?;

        let review = self
            .store
            .insert_review(&NewReview {
                user_id: user,
                product_id: request.product_id,
                order_id: request.order_id,
                rating,
                title,
                comment,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AppError::DuplicateReview,
                other => other.into(),
            })?;

        tracing::info!(review_id = %review.id, rating, "Review submitted");
        Ok(review)
    }

    /// Delete one of the user's own reviews.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown review and
    /// `AppError::Unauthorized` when it belongs to someone else.
    #[instrument(skip(self))]
    pub async fn delete(&self, user: UserId, id: ReviewId) -> Result<()> {
        let review = self
            .store
            .get_review(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
        if review.user_id != user {
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        }

        if !self.store.delete_review(id).await? {
            return Err(AppError::NotFound("Review not found".to_string()));
        }
        Ok(())
    }

    /// A product's reviews, newest first, with reviewer names.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn for_product(&self, product: ProductId) -> Result<Vec<ReviewView>> {
        Ok(self.store.list_product_reviews(product).await?)
    }

    /// The user's reviews, newest first, with product names.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn for_user(&self, user: UserId) -> Result<Vec<ReviewView>> {
        Ok(self.store.list_user_reviews(user).await?)
    }

    /// Every (product, delivered order) pair the user has not reviewed yet.
    /// Products that no longer exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn eligible_products(&self, user: UserId) -> Result<Vec<EligibleProduct>> {
        let delivered: Vec<_> = self
            .store
            .list_orders(OrderScope::Customer(user))
            .await?
            .into_iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .collect();
        if delivered.is_empty() {
            return Ok(Vec::new());
        }

        let reviewed = self.store.reviewed_pairs(user).await?;
        let product_ids: Vec<ProductId> = delivered
            .iter()
            .flat_map(|o| o.items.iter().map(|i| i.product_id))
            .collect();
        let products = self.store.products_by_ids(&product_ids).await?;

        let mut eligible = Vec::new();
        for order in &delivered {
            for item in &order.items {
                if reviewed.contains(&(item.product_id, order.id)) {
                    continue;
                }
                let Some(product) = products.get(&item.product_id) else {
                    continue;
                };
                eligible.push(EligibleProduct {
                    product: product.clone(),
                    order: EligibleOrder {
                        id: order.id,
                        order_number: order.order_number.clone(),
                        updated_at: order.updated_at,
                    },
                });
            }
        }
        Ok(eligible)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use threadline_core::{OrderId, Price, Size};

    use super::*;
    use crate::db::memory::tests::{new_user, seed_product};
    use crate::db::{MemoryStore, OrderStore, UserStore};
    use crate::models::{CustomerInfo, NewOrder, OrderItem};

    async fn order_for(
        store: &MemoryStore,
        user: UserId,
        products: &[ProductId],
        status: OrderStatus,
    ) -> OrderId {
        let order = store
            .place_order(&NewOrder {
                order_number: format!("ORD-{}-{}", user, products.len()),
                user_id: user,
                items: products
                    .iter()
                    .map(|&product_id| OrderItem {
                        product_id,
                        size: Size::M,
                        color: None,
                        quantity: 1,
                        price: Price::new(Decimal::new(2500, 2)).unwrap(),
                    })
                    .collect(),
                total: Price::new(Decimal::new(2500, 2)).unwrap(),
                customer_info: CustomerInfo {
                    full_name: "Ada".into(),
                    phone_number: "555".into(),
                    address: "Street".into(),
                    notes: String::new(),
                },
            })
            .await
            .unwrap();
        store.set_order_status(order.id, status).await.unwrap();
        order.id
    }

    fn request(product_id: ProductId, order_id: OrderId, rating: i32) -> ReviewRequest {
        ReviewRequest {
            product_id,
            order_id,
            rating,
            title: Some("Great".into()),
            comment: Some("Fits well".into()),
        }
    }

    #[tokio::test]
    async fn test_submit_then_duplicate() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("r@example.com")).await.unwrap();
        let product = seed_product(&store, "SHI-0001", &[(Size::M, 5)]).await;
        let order = order_for(&store, user.id, &[product.id], OrderStatus::Delivered).await;
        let service = ReviewService::new(&store);

        let review = service
            .submit(user.id, request(product.id, order, 5))
            .await
            .unwrap();
        assert_eq!(review.rating, 5);
        assert!(review.is_verified);

        let err = service
            .submit(user.id, request(product.id, order, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateReview));
    }

    #[tokio::test]
    async fn test_undelivered_or_foreign_order_is_ineligible() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("r@example.com")).await.unwrap();
        let other = store.create_user(&new_user("o@example.com")).await.unwrap();
        let product = seed_product(&store, "SHI-0001", &[(Size::M, 5)]).await;
        let shipped = order_for(&store, user.id, &[product.id], OrderStatus::Shipped).await;
        let foreign = order_for(&store, other.id, &[product.id], OrderStatus::Delivered).await;
        let service = ReviewService::new(&store);

        for order in [shipped, foreign, OrderId::new(999)] {
            let err = service
                .submit(user.id, request(product.id, order, 5))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidEligibility(_)));
        }
    }

    #[tokio::test]
    async fn test_rating_and_length_limits() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("r@example.com")).await.unwrap();
        let product = seed_product(&store, "SHI-0001", &[(Size::M, 5)]).await;
        let order = order_for(&store, user.id, &[product.id], OrderStatus::Delivered).await;
        let service = ReviewService::new(&store);

        for rating in [0, 6, -1] {
            assert!(matches!(
                service.submit(user.id, request(product.id, order, rating)).await,
                Err(AppError::Validation(_))
            ));
        }

        let mut long_title = request(product.id, order, 3);
        long_title.title = Some("x".repeat(101));
        assert!(matches!(
            service.submit(user.id, long_title).await,
            Err(AppError::Validation(_))
        ));

        let mut long_comment = request(product.id, order, 3);
        long_comment.comment = Some("x".repeat(1001));
        assert!(matches!(
            service.submit(user.id, long_comment).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_only_by_owner() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("r@example.com")).await.unwrap();
        let other = store.create_user(&new_user("o@example.com")).await.unwrap();
        let product = seed_product(&store, "SHI-0001", &[(Size::M, 5)]).await;
        let order = order_for(&store, user.id, &[product.id], OrderStatus::Delivered).await;
        let service = ReviewService::new(&store);
        let review = service
            .submit(user.id, request(product.id, order, 4))
            .await
            .unwrap();

        assert!(matches!(
            service.delete(other.id, review.id).await,
            Err(AppError::Unauthorized(_))
        ));
        service.delete(user.id, review.id).await.unwrap();
        assert!(matches!(
            service.delete(user.id, review.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_eligible_products_skip_reviewed_pairs() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("r@example.com")).await.unwrap();
        let first = seed_product(&store, "SHI-0001", &[(Size::M, 5)]).await;
        let second = seed_product(&store, "SHI-0002", &[(Size::M, 5)]).await;
        let delivered = order_for(
            &store,
            user.id,
            &[first.id, second.id],
            OrderStatus::Delivered,
        )
        .await;
        order_for(&store, user.id, &[first.id], OrderStatus::Pending).await;
        let service = ReviewService::new(&store);

        assert_eq!(service.eligible_products(user.id).await.unwrap().len(), 2);

        service
            .submit(user.id, request(first.id, delivered, 5))
            .await
            .unwrap();
        let eligible = service.eligible_products(user.id).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].product.id, second.id);
        assert_eq!(eligible[0].order.id, delivered);

        let mine = service.for_user(user.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].product_name.as_deref(), Some("Product SHI-0001"));
    }
}
