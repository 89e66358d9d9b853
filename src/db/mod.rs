pub mod config;
pub mod migrate;

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError};

#[derive(Clone)]
pub struct DatabaseProxy {
    config: DbConfig,
    pool: PgPool,
}

impl DatabaseProxy {
    pub async fn from_env() -> Result<Arc<Self>, DbInitError> {
        let config = DbConfig::from_env()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.primary_url)
            .await
            .map_err(DbInitError::Sqlx)?;

        migrate::run_migrations(&pool).await?;

        Ok(Arc::new(Self { config, pool }))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn connection_string(&self) -> &str {
        &self.config.primary_url
    }

    pub async fn check_health(&self) -> Result<Duration, String> {
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await;

        match result {
            Ok(Ok(_)) => Ok(started.elapsed()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err("timeout".to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("database configuration error: {0}")]
    Config(#[from] DbConfigError),
    #[error("database connection error: {0}")]
    Sqlx(sqlx::Error),
    #[error(transparent)]
    Migration(#[from] migrate::MigrationError),
}
