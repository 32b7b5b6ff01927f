use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spotlight::app::auth::AuthService;
use spotlight::config::{AppConfig, StoreBackend};
use spotlight::http;
use spotlight::infra::db::Db;
use spotlight::infra::memory_store::MemoryNotificationStore;
use spotlight::infra::pg_store::PgNotificationStore;
use spotlight::infra::store::NotificationStore;
use spotlight::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn NotificationStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db = Db::connect(&config).await?;
            Arc::new(PgNotificationStore::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory notification store; data is lost on restart");
            Arc::new(MemoryNotificationStore::new())
        }
    };
    let identity = Arc::new(AuthService::new(
        config.paseto_access_key,
        config.access_ttl_minutes,
    ));

    let state = AppState {
        store,
        identity,
        admin_token: config.admin_token.clone(),
    };

    let app: Router = http::router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
