pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::app::auth::IdentityProvider;
use crate::infra::store::NotificationStore;

/// Collaborators shared by every request. Built once at startup and handed
/// to handlers explicitly; nothing is reconstructed per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub admin_token: Option<String>,
}
