use std::any::Any;

use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod response;
mod routes;

pub use auth::{AdminToken, AuthUser, SESSION_COOKIE};
pub use error::AppError;
pub use response::ApiResponse;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::notifications())
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Last line of defence: a panicking handler still answers with the
/// standard envelope.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "request handler panicked");

    AppError::internal(error::INTERNAL_SERVER_ERROR).into_response()
}
