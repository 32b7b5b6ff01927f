use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing required env var: DATABASE_URL"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
