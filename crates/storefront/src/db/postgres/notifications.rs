//! Notification queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use threadline_core::{NotificationId, NotificationKind, RelatedKind, UserId};

use super::PgStore;
use crate::db::{NotificationStore, RepositoryError};
use crate::models::{NewNotification, Notification, RelatedRef};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: NotificationId,
    user_id: UserId,
    kind: NotificationKind,
    title: String,
    message: String,
    read: bool,
    related_kind: Option<RelatedKind>,
    related_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let related = row
            .related_kind
            .zip(row.related_id)
            .map(|(kind, id)| RelatedRef { kind, id });

        Self {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            title: row.title,
            message: row.message,
            read: row.read,
            related,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notifications(&self, batch: &[NewNotification]) -> Result<(), RepositoryError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for n in batch {
            sqlx::query(
                r"
                INSERT INTO notifications (user_id, kind, title, message, related_kind, related_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(n.user_id)
            .bind(n.kind)
            .bind(&n.title)
            .bind(&n.message)
            .bind(n.related.map(|r| r.kind))
            .bind(n.related.map(|r| r.id))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn list_notifications(
        &self,
        user: UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, user_id, kind, title, message, read, related_kind, related_id, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(user)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn unread_count(&self, user: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_all_read(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
