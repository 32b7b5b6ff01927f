use axum::{routing::get, routing::post, Router};

use crate::AppState;
use crate::http::handlers;

pub fn health() -> Router<AppState> {
    Router::new().route(
        "/health",
        get(handlers::health).fallback(handlers::method_not_allowed),
    )
}

// Each method router answers unsupported methods with the envelope rather
// than axum's empty 405.
pub fn notifications() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notifications",
            get(handlers::list_notifications)
                .post(handlers::create_notification)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/notifications/unread-count",
            get(handlers::unread_count).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/notifications/mark-all-read",
            post(handlers::mark_all_read).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/notifications/:id/read",
            post(handlers::mark_notification_read).fallback(handlers::method_not_allowed),
        )
}
