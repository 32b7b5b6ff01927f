use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::notification::{NewNotification, Notification};
use crate::infra::store::{NotificationFilter, NotificationStore, PageCursor, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkAllOutcome {
    pub updated: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadOutcome {
    Marked,
    AlreadyRead,
    NotFound,
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        cursor: Option<PageCursor>,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut filter = NotificationFilter::owned_by(user_id);
        if unread_only {
            filter = filter.unread();
        }
        self.store.list(&filter, cursor, limit).await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, StoreError> {
        self.store
            .count(&NotificationFilter::owned_by(user_id).unread())
            .await
    }

    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<MarkReadOutcome, StoreError> {
        let filter = NotificationFilter::owned_by(user_id).with_id(notification_id);
        let updated = self
            .store
            .mark_read(&filter, OffsetDateTime::now_utc())
            .await?;
        if updated > 0 {
            return Ok(MarkReadOutcome::Marked);
        }

        // Nothing changed: either it was already read, or the caller does
        // not own a notification with this id.
        if self.store.count(&filter).await? > 0 {
            Ok(MarkReadOutcome::AlreadyRead)
        } else {
            Ok(MarkReadOutcome::NotFound)
        }
    }

    /// Marks every unread notification owned by `user_id` as read, stamping
    /// all of them with the same timestamp.
    ///
    /// On failure the store decides how much was applied; the Postgres and
    /// in-memory stores both apply the batch as a unit. Re-running after a
    /// failure converges either way.
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<MarkAllOutcome, StoreError> {
        let filter = NotificationFilter::owned_by(user_id).unread();
        let updated = self
            .store
            .mark_read(&filter, OffsetDateTime::now_utc())
            .await?;
        Ok(MarkAllOutcome { updated })
    }

    pub async fn create(&self, draft: NewNotification) -> Result<Notification, StoreError> {
        self.store.insert(draft).await
    }
}
