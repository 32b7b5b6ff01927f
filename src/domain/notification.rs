use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: Value,
    pub read: bool,
    /// Set exactly when `read` flips to true, never refreshed afterwards.
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Notification {
    pub fn from_draft(id: Uuid, draft: NewNotification, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            payload: draft.payload,
            read: false,
            read_at: None,
            created_at,
        }
    }

    /// Applies the unread -> read transition. Returns false when the
    /// notification was already read, in which case nothing changes.
    pub fn mark_read(&mut self, at: OffsetDateTime) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        self.read_at = Some(at);
        true
    }
}

/// Input for a new notification, produced by whatever event raised it.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequested,
    BookingAccepted,
    BookingDeclined,
    BookingCompleted,
    VideoDelivered,
    PaymentReceived,
    ReviewReceived,
    System,
}

impl NotificationKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "booking_requested" => Some(Self::BookingRequested),
            "booking_accepted" => Some(Self::BookingAccepted),
            "booking_declined" => Some(Self::BookingDeclined),
            "booking_completed" => Some(Self::BookingCompleted),
            "video_delivered" => Some(Self::VideoDelivered),
            "payment_received" => Some(Self::PaymentReceived),
            "review_received" => Some(Self::ReviewReceived),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::BookingRequested => "booking_requested",
            Self::BookingAccepted => "booking_accepted",
            Self::BookingDeclined => "booking_declined",
            Self::BookingCompleted => "booking_completed",
            Self::VideoDelivered => "video_delivered",
            Self::PaymentReceived => "payment_received",
            Self::ReviewReceived => "review_received",
            Self::System => "system",
        }
    }
}
