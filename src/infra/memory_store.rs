use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::notification::{NewNotification, Notification};
use crate::infra::store::{NotificationFilter, NotificationStore, PageCursor, StoreError};

/// Process-local store used for `STORE_BACKEND=memory` and the test suite.
#[derive(Clone, Default)]
pub struct MemoryNotificationStore {
    rows: Arc<RwLock<Vec<Notification>>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed row, bypassing the unread default.
    pub async fn seed(&self, notification: Notification) {
        self.rows.write().await.push(notification);
    }

    pub async fn get(&self, id: Uuid) -> Option<Notification> {
        self.rows
            .read()
            .await
            .iter()
            .find(|notification| notification.id == id)
            .cloned()
    }

    pub async fn snapshot(&self) -> Vec<Notification> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, draft: NewNotification) -> Result<Notification, StoreError> {
        let notification =
            Notification::from_draft(Uuid::new_v4(), draft, OffsetDateTime::now_utc());
        self.rows.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
        cursor: Option<PageCursor>,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = self.rows.read().await;
        let mut matched: Vec<Notification> = rows
            .iter()
            .filter(|notification| filter.matches(notification))
            .filter(|notification| match cursor {
                Some(position) => (notification.created_at, notification.id) < position,
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        matched.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matched)
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<i64, StoreError> {
        let rows = self.rows.read().await;
        let count = rows
            .iter()
            .filter(|notification| filter.matches(notification))
            .count();
        Ok(count as i64)
    }

    async fn mark_read(
        &self,
        filter: &NotificationFilter,
        at: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let filter = filter.clone().unread();
        // One write guard for the whole batch, so readers never observe a
        // partially applied update.
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for notification in rows.iter_mut().filter(|n| filter.matches(n)) {
            if notification.mark_read(at) {
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
