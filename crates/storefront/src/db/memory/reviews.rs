use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;

use threadline_core::{OrderId, ProductId, ReviewId, UserId};

use super::MemoryStore;
use crate::db::{RepositoryError, ReviewStore};
use crate::models::{NewReview, Review, ReviewView};

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, new: &NewReview) -> Result<Review, RepositoryError> {
        let mut state = self.state.write().await;
        let taken = state.reviews.values().any(|r| {
            r.user_id == new.user_id && r.product_id == new.product_id && r.order_id == new.order_id
        });
        if taken {
            return Err(RepositoryError::Conflict("review already exists".to_owned()));
        }

        let now = Utc::now();
        let review = Review {
            id: ReviewId::new(state.next_id()),
            user_id: new.user_id,
            product_id: new.product_id,
            order_id: new.order_id,
            rating: new.rating,
            title: new.title.clone(),
            comment: new.comment.clone(),
            is_verified: true,
            created_at: now,
            updated_at: now,
        };
        state.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn review_exists(
        &self,
        user: UserId,
        product: ProductId,
        order: OrderId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .any(|r| r.user_id == user && r.product_id == product && r.order_id == order))
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.state.read().await.reviews.get(&id).cloned())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        Ok(self.state.write().await.reviews.remove(&id).is_some())
    }

    async fn list_product_reviews(
        &self,
        product: ProductId,
    ) -> Result<Vec<ReviewView>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .rev()
            .filter(|r| r.product_id == product)
            .map(|r| {
                let reviewer = state.users.get(&r.user_id).map(|u| &u.user);
                ReviewView {
                    review: r.clone(),
                    reviewer_first_name: reviewer.map(|u| u.first_name.clone()),
                    reviewer_last_name: reviewer.map(|u| u.last_name.clone()),
                    product_name: None,
                }
            })
            .collect())
    }

    async fn list_user_reviews(&self, user: UserId) -> Result<Vec<ReviewView>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .rev()
            .filter(|r| r.user_id == user)
            .map(|r| ReviewView {
                review: r.clone(),
                reviewer_first_name: None,
                reviewer_last_name: None,
                product_name: state.products.get(&r.product_id).map(|p| p.name.clone()),
            })
            .collect())
    }

    async fn reviewed_pairs(
        &self,
        user: UserId,
    ) -> Result<HashSet<(ProductId, OrderId)>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.user_id == user)
            .map(|r| (r.product_id, r.order_id))
            .collect())
    }
}
