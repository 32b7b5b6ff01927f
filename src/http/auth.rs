use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName};
use axum_extra::extract::cookie::CookieJar;
use subtle::ConstantTimeEq;

use crate::http::error::INTERNAL_SERVER_ERROR;
use crate::http::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
}

#[derive(Debug, Clone)]
pub struct AdminToken;

pub const SESSION_COOKIE: &str = "access_token";
const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = session_credential(&parts.headers).ok_or_else(AppError::unauthorized)?;

        let session = state
            .identity
            .resolve_caller(&credential)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "identity provider failed");
                AppError::internal(INTERNAL_SERVER_ERROR)
            })?;

        let session = session.ok_or_else(AppError::unauthorized)?;
        Ok(AuthUser {
            user_id: session.user_id,
        })
    }
}

/// Bearer header first, then the session cookie. A present but malformed
/// Authorization header does not fall through to the cookie.
fn session_credential(headers: &HeaderMap) -> Option<String> {
    let credential = match headers.get(header::AUTHORIZATION) {
        Some(value) => value.to_str().ok()?.strip_prefix("Bearer ")?.trim().to_string(),
        None => CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)?
            .value()
            .to_string(),
    };

    if credential.is_empty() {
        None
    } else {
        Some(credential)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_token
            .as_ref()
            .ok_or_else(|| AppError::forbidden("admin token not configured"))?;

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::forbidden("missing admin token"))?;

        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AppError::forbidden("invalid admin token"));
        }

        Ok(AdminToken)
    }
}
