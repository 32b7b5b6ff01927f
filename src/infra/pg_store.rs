use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::notification::{NewNotification, Notification, NotificationKind};
use crate::infra::db::Db;
use crate::infra::store::{NotificationFilter, NotificationStore, PageCursor, StoreError};

const COLUMNS: &str = "id, user_id, kind, title, message, payload, read, read_at, created_at";

#[derive(Clone)]
pub struct PgNotificationStore {
    db: Db,
}

impl PgNotificationStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, draft: NewNotification) -> Result<Notification, StoreError> {
        let sql = format!(
            "INSERT INTO notifications (user_id, kind, title, message, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(draft.user_id)
            .bind(draft.kind.as_db())
            .bind(draft.title)
            .bind(draft.message)
            .bind(draft.payload)
            .fetch_one(self.db.pool())
            .await?;

        notification_from_row(&row)
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
        cursor: Option<PageCursor>,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = list_query(filter, cursor, limit)
            .build()
            .fetch_all(self.db.pool())
            .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<i64, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notifications");
        push_predicate(&mut builder, filter);
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn mark_read(
        &self,
        filter: &NotificationFilter,
        at: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        // A single UPDATE statement: Postgres applies it to all matching
        // rows or none.
        let result = mark_read_query(filter, at)
            .build()
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.ping().await?;
        Ok(())
    }
}

fn list_query(
    filter: &NotificationFilter,
    cursor: Option<PageCursor>,
    limit: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {COLUMNS} FROM notifications"));
    push_predicate(&mut builder, filter);
    if let Some((created_at, id)) = cursor {
        builder
            .push(" AND (created_at < ")
            .push_bind(created_at)
            .push(" OR (created_at = ")
            .push_bind(created_at)
            .push(" AND id < ")
            .push_bind(id)
            .push("))");
    }
    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit);
    builder
}

fn mark_read_query(
    filter: &NotificationFilter,
    at: OffsetDateTime,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE notifications SET read = TRUE, read_at = ");
    builder.push_bind(at);
    push_predicate(&mut builder, &filter.clone().unread());
    builder
}

fn push_predicate(builder: &mut QueryBuilder<'static, Postgres>, filter: &NotificationFilter) {
    builder.push(" WHERE user_id = ").push_bind(filter.owner());
    if let Some(id) = filter.id() {
        builder.push(" AND id = ").push_bind(id);
    }
    if let Some(read) = filter.read() {
        builder.push(" AND read = ").push_bind(read);
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification, StoreError> {
    let kind: String = row.try_get("kind")?;
    let kind = NotificationKind::from_db(&kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown kind {kind:?}")))?;
    let id: Uuid = row.try_get("id")?;

    Ok(Notification {
        id,
        user_id: row.try_get("user_id")?,
        kind,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        payload: row.try_get("payload")?,
        read: row.try_get("read")?,
        read_at: row.try_get("read_at")?,
        created_at: row.try_get("created_at")?,
    })
}
