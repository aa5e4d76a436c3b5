//! Review queries.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use threadline_core::{OrderId, ProductId, ReviewId, UserId};

use super::{PgStore, unique_violation};
use crate::db::{RepositoryError, ReviewStore};
use crate::models::{NewReview, Review, ReviewView};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    user_id: UserId,
    product_id: ProductId,
    order_id: OrderId,
    rating: i16,
    title: Option<String>,
    comment: Option<String>,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            order_id: row.order_id,
            rating: row.rating,
            title: row.title,
            comment: row.comment,
            is_verified: row.is_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewViewRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    reviewer_first_name: Option<String>,
    reviewer_last_name: Option<String>,
    product_name: Option<String>,
}

impl From<ReviewViewRow> for ReviewView {
    fn from(row: ReviewViewRow) -> Self {
        Self {
            review: row.review.into(),
            reviewer_first_name: row.reviewer_first_name,
            reviewer_last_name: row.reviewer_last_name,
            product_name: row.product_name,
        }
    }
}

const REVIEW_COLUMNS: &str = "r.id, r.user_id, r.product_id, r.order_id, r.rating, r.title, \
     r.comment, r.is_verified, r.created_at, r.updated_at";

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert_review(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            INSERT INTO reviews AS r (user_id, product_id, order_id, rating, title, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(review.user_id)
        .bind(review.product_id)
        .bind(review.order_id)
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "review"))?;

        Ok(row.into())
    }

    async fn review_exists(
        &self,
        user: UserId,
        product: ProductId,
        order: OrderId,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM reviews
                WHERE user_id = $1 AND product_id = $2 AND order_id = $3
            )
            ",
        )
        .bind(user)
        .bind(product)
        .bind(order)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_product_reviews(
        &self,
        product: ProductId,
    ) -> Result<Vec<ReviewView>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewViewRow>(&format!(
            r"
            SELECT {REVIEW_COLUMNS},
                   u.first_name AS reviewer_first_name,
                   u.last_name AS reviewer_last_name,
                   NULL::text AS product_name
            FROM reviews r
            LEFT JOIN users u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "
        ))
        .bind(product)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_user_reviews(&self, user: UserId) -> Result<Vec<ReviewView>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewViewRow>(&format!(
            r"
            SELECT {REVIEW_COLUMNS},
                   NULL::text AS reviewer_first_name,
                   NULL::text AS reviewer_last_name,
                   p.name AS product_name
            FROM reviews r
            LEFT JOIN products p ON p.id = r.product_id
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn reviewed_pairs(
        &self,
        user: UserId,
    ) -> Result<HashSet<(ProductId, OrderId)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (ProductId, OrderId)>(
            "SELECT product_id, order_id FROM reviews WHERE user_id = $1",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
