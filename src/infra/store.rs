use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::notification::{NewNotification, Notification};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt notification row: {0}")]
    Corrupt(String),
}

/// Row predicate for the `notifications` table.
///
/// The only way to build one is [`NotificationFilter::owned_by`], so every
/// query and update issued through a filter is scoped to a single owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFilter {
    owner: Uuid,
    id: Option<Uuid>,
    read: Option<bool>,
}

impl NotificationFilter {
    pub fn owned_by(owner: Uuid) -> Self {
        Self {
            owner,
            id: None,
            read: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn unread(mut self) -> Self {
        self.read = Some(false);
        self
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn read(&self) -> Option<bool> {
        self.read
    }

    pub fn matches(&self, notification: &Notification) -> bool {
        notification.user_id == self.owner
            && self.id.map_or(true, |id| notification.id == id)
            && self.read.map_or(true, |read| notification.read == read)
    }
}

/// Keyset position: `(created_at, id)` of the last row already returned.
pub type PageCursor = (OffsetDateTime, Uuid);

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, draft: NewNotification) -> Result<Notification, StoreError>;

    /// Rows matching `filter`, newest first, strictly after `cursor`.
    async fn list(
        &self,
        filter: &NotificationFilter,
        cursor: Option<PageCursor>,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn count(&self, filter: &NotificationFilter) -> Result<i64, StoreError>;

    /// Sets `read = true, read_at = at` on every unread row matching
    /// `filter` and returns how many rows changed. Rows that are already
    /// read keep their original `read_at`.
    async fn mark_read(
        &self,
        filter: &NotificationFilter,
        at: OffsetDateTime,
    ) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
