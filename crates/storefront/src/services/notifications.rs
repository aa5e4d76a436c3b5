//! Notification feed and fan-out.

use tracing::instrument;

use threadline_core::{NotificationId, NotificationKind, UserId};

use crate::db::Store;
use crate::error::Result;
use crate::models::{NewNotification, NotificationFeed, RelatedRef};

/// Notifications returned when the caller does not ask for a limit.
pub const DEFAULT_FEED_LIMIT: i64 = 10;

/// What a notification says and what it points at.
#[derive(Debug, Clone)]
pub struct NotificationContent {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related: Option<RelatedRef>,
}

pub struct NotificationService<'a> {
    store: &'a dyn Store,
}

impl<'a> NotificationService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Write one notification for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the insert fails.
    #[instrument(skip(self, content), fields(kind = ?content.kind))]
    pub async fn notify(&self, user: UserId, content: NotificationContent) -> Result<()> {
        self.store
            .insert_notifications(&[NewNotification {
                user_id: user,
                kind: content.kind,
                title: content.title,
                message: content.message,
                related: content.related,
            }])
            .await?;
        Ok(())
    }

    /// Write the same notification for every admin. Returns how many were
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the admins cannot be listed or the
    /// insert fails.
    #[instrument(skip(self, content), fields(kind = ?content.kind))]
    pub async fn notify_admins(&self, content: NotificationContent) -> Result<usize> {
        let admins = self.store.list_admin_ids().await?;
        let batch: Vec<NewNotification> = admins
            .into_iter()
            .map(|user_id| NewNotification {
                user_id,
                kind: content.kind,
                title: content.title.clone(),
                message: content.message.clone(),
                related: content.related,
            })
            .collect();

        self.store.insert_notifications(&batch).await?;
        Ok(batch.len())
    }

    /// Newest notifications plus the total unread count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn feed(&self, user: UserId, limit: Option<i64>) -> Result<NotificationFeed> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_FEED_LIMIT);
        let notifications = self.store.list_notifications(user, limit).await?;
        let unread_count = self.store.unread_count(user).await?;

        Ok(NotificationFeed {
            notifications,
            unread_count,
        })
    }

    /// Mark one of `user`'s notifications read. Returns the unread count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<i64> {
        self.store.mark_read(user, id).await?;
        Ok(self.store.unread_count(user).await?)
    }

    /// Mark all of `user`'s notifications read. Returns the unread count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn mark_all_read(&self, user: UserId) -> Result<i64> {
        self.store.mark_all_read(user).await?;
        Ok(self.store.unread_count(user).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use threadline_core::{RelatedKind, UserRole};

    use super::*;
    use crate::db::memory::tests::new_user;
    use crate::db::{MemoryStore, UserStore};

    fn content(title: &str) -> NotificationContent {
        NotificationContent {
            kind: NotificationKind::System,
            title: title.into(),
            message: "hello".into(),
            related: Some(RelatedRef {
                kind: RelatedKind::Order,
                id: 7,
            }),
        }
    }

    #[tokio::test]
    async fn test_feed_is_newest_first_with_default_limit() {
        let store = MemoryStore::new();
        let service = NotificationService::new(&store);
        let user = UserId::new(1);
        for i in 0..12 {
            service.notify(user, content(&format!("n{i}"))).await.unwrap();
        }

        let feed = service.feed(user, None).await.unwrap();
        assert_eq!(feed.notifications.len(), 10);
        assert_eq!(feed.notifications[0].title, "n11");
        assert_eq!(feed.unread_count, 12);
    }

    #[tokio::test]
    async fn test_mark_read_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let service = NotificationService::new(&store);
        let owner = UserId::new(1);
        let other = UserId::new(2);
        service.notify(owner, content("mine")).await.unwrap();
        let id = service.feed(owner, None).await.unwrap().notifications[0].id;

        assert_eq!(service.mark_read(other, id).await.unwrap(), 0);
        assert_eq!(service.feed(owner, None).await.unwrap().unread_count, 1);

        assert_eq!(service.mark_read(owner, id).await.unwrap(), 0);
        service.notify(owner, content("again")).await.unwrap();
        assert_eq!(service.mark_all_read(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_notify_admins_reaches_every_admin() {
        let store = MemoryStore::new();
        let a = store.create_user(&new_user("a@example.com")).await.unwrap();
        let b = store.create_user(&new_user("b@example.com")).await.unwrap();
        store.create_user(&new_user("c@example.com")).await.unwrap();
        store.set_user_role(&a.email, UserRole::Admin).await.unwrap();
        store.set_user_role(&b.email, UserRole::Admin).await.unwrap();

        let service = NotificationService::new(&store);
        assert_eq!(service.notify_admins(content("new")).await.unwrap(), 2);
        assert_eq!(service.feed(a.id, None).await.unwrap().unread_count, 1);
        assert_eq!(service.feed(b.id, None).await.unwrap().unread_count, 1);
    }
}
