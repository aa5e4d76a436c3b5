use async_trait::async_trait;
use chrono::Utc;

use threadline_core::{NotificationId, UserId};

use super::MemoryStore;
use crate::db::{NotificationStore, RepositoryError};
use crate::models::{NewNotification, Notification};

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notifications(&self, batch: &[NewNotification]) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        for new in batch {
            let notification = Notification {
                id: NotificationId::new(state.next_id()),
                user_id: new.user_id,
                kind: new.kind,
                title: new.title.clone(),
                message: new.message.clone(),
                read: false,
                related: new.related,
                created_at: Utc::now(),
            };
            state.notifications.insert(notification.id, notification);
        }
        Ok(())
    }

    async fn list_notifications(
        &self,
        user: UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .values()
            .rev()
            .filter(|n| n.user_id == user)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn unread_count(&self, user: UserId) -> Result<i64, RepositoryError> {
        let state = self.state.read().await;
        let count = state
            .notifications
            .values()
            .filter(|n| n.user_id == user && !n.read)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn mark_read(&self, user: UserId, id: NotificationId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(n) = state.notifications.get_mut(&id)
            && n.user_id == user
        {
            n.read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self, user: UserId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        for n in state.notifications.values_mut().filter(|n| n.user_id == user) {
            n.read = true;
        }
        Ok(())
    }
}
