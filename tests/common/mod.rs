#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pasetors::claims::Claims;
use pasetors::keys::SymmetricKey;
use pasetors::{local, version4::V4};
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

use spotlight::app::auth::{AuthService, AuthSession, IdentityProvider};
use spotlight::config::decode_key_32;
use spotlight::domain::notification::{NewNotification, Notification, NotificationKind};
use spotlight::infra::memory_store::MemoryNotificationStore;
use spotlight::infra::store::{NotificationFilter, NotificationStore, PageCursor, StoreError};
use spotlight::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// "0123456789abcdef0123456789abcdef" (32 bytes), test-only
pub const TEST_PASETO_ACCESS_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
// "fedcba9876543210fedcba9876543210" (32 bytes), test-only
pub const OTHER_PASETO_KEY: &str = "ZmVkY2JhOTg3NjU0MzIxMGZlZGNiYTk4NzY1NDMyMTA=";
pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";

// ---------------------------------------------------------------------------
// TestApp: one per test, backed by the in-memory store
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub store: MemoryNotificationStore,
    pub instrumented: Arc<InstrumentedStore>,
    pub auth: AuthService,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub access_token: String,
}

pub fn auth_service(key: &str) -> AuthService {
    AuthService::new(decode_key_32("PASETO_ACCESS_KEY", key).unwrap(), 15)
}

/// Encrypts a v4.local token by hand so tests control every claim the
/// service would normally set itself.
pub fn forge_token(key: &str, user_id: Uuid, expires_at: &str, token_type: &str) -> String {
    let key = decode_key_32("PASETO_ACCESS_KEY", key).unwrap();
    let key = SymmetricKey::<V4>::from(&key).unwrap();

    let mut claims = Claims::new().unwrap();
    claims.issued_at("2020-01-01T00:00:00+00:00").unwrap();
    claims.not_before("2020-01-01T00:00:00+00:00").unwrap();
    claims.expiration(expires_at).unwrap();
    claims.issuer("spotlight").unwrap();
    claims.audience("spotlight").unwrap();
    claims.subject(&user_id.to_string()).unwrap();
    claims.add_additional("typ", token_type).unwrap();

    local::encrypt(&key, &claims, None, None).unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(StoreMode::Healthy, None)
    }

    /// Store calls fail with a database-level error.
    pub fn with_failing_store() -> Self {
        Self::build(StoreMode::Failing, None)
    }

    /// Store calls panic mid-request.
    pub fn with_panicking_store() -> Self {
        Self::build(StoreMode::Panicking, None)
    }

    /// The identity provider itself errors on every lookup.
    pub fn with_broken_identity() -> Self {
        Self::build(StoreMode::Healthy, Some(Arc::new(BrokenIdentity)))
    }

    fn build(mode: StoreMode, identity: Option<Arc<dyn IdentityProvider>>) -> Self {
        let store = MemoryNotificationStore::new();
        let instrumented = Arc::new(InstrumentedStore {
            inner: store.clone(),
            calls: AtomicUsize::new(0),
            mode,
        });
        let auth = auth_service(TEST_PASETO_ACCESS_KEY);
        let identity: Arc<dyn IdentityProvider> = match identity {
            Some(identity) => identity,
            None => Arc::new(auth.clone()),
        };

        let state = AppState {
            store: instrumented.clone(),
            identity,
            admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
        };

        TestApp {
            router: spotlight::http::router(state),
            store,
            instrumented,
            auth,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, None, &headers).await
    }

    /// POST with an admin token in the x-admin-token header.
    pub async fn post_admin(
        &self,
        path: &str,
        body: Value,
        admin_token: Option<&str>,
    ) -> TestResponse {
        let mut headers = vec![];
        if let Some(t) = admin_token {
            headers.push(("x-admin-token", t));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn mark_all_read(&self, token: Option<&str>) -> TestResponse {
        self.post("/api/notifications/mark-all-read", token).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    pub fn create_user(&self) -> TestUser {
        let id = Uuid::new_v4();
        let (access_token, _) = self
            .auth
            .issue_access_token(id)
            .expect("issue_access_token failed");
        TestUser { id, access_token }
    }

    /// Seed a notification directly in the store. `age_minutes` pushes
    /// `created_at` into the past so ordering is deterministic.
    pub async fn seed_notification(
        &self,
        user_id: Uuid,
        read: bool,
        age_minutes: i64,
    ) -> Notification {
        let created_at = OffsetDateTime::now_utc() - Duration::minutes(age_minutes);
        let mut notification = Notification::from_draft(
            Uuid::new_v4(),
            NewNotification {
                user_id,
                kind: NotificationKind::BookingRequested,
                title: "New booking request".to_string(),
                message: format!("Booking request #{}", age_minutes),
                payload: json!({ "booking_id": Uuid::new_v4() }),
            },
            created_at,
        );
        if read {
            notification.mark_read(created_at + Duration::seconds(30));
        }
        self.store.seed(notification.clone()).await;
        notification
    }

    pub async fn notification(&self, id: Uuid) -> Notification {
        self.store.get(id).await.expect("notification missing from store")
    }

    pub fn store_calls(&self) -> usize {
        self.instrumented.calls.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Healthy,
    Failing,
    Panicking,
}

/// Wraps the in-memory store, counting calls and optionally failing them.
pub struct InstrumentedStore {
    inner: MemoryNotificationStore,
    calls: AtomicUsize,
    mode: StoreMode,
}

impl InstrumentedStore {
    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            StoreMode::Healthy => Ok(()),
            StoreMode::Failing => Err(StoreError::Database(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused (os error 111)",
            )))),
            StoreMode::Panicking => panic!("connection pool poisoned"),
        }
    }
}

#[async_trait]
impl NotificationStore for InstrumentedStore {
    async fn insert(&self, draft: NewNotification) -> Result<Notification, StoreError> {
        self.enter()?;
        self.inner.insert(draft).await
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
        cursor: Option<PageCursor>,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        self.enter()?;
        self.inner.list(filter, cursor, limit).await
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<i64, StoreError> {
        self.enter()?;
        self.inner.count(filter).await
    }

    async fn mark_read(
        &self,
        filter: &NotificationFilter,
        at: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        self.enter()?;
        self.inner.mark_read(filter, at).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.enter()?;
        self.inner.ping().await
    }
}

struct BrokenIdentity;

#[async_trait]
impl IdentityProvider for BrokenIdentity {
    async fn resolve_caller(&self, _credential: &str) -> anyhow::Result<Option<AuthSession>> {
        Err(anyhow::anyhow!("identity backend timed out: upstream 10.0.0.7:443"))
    }
}
