use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub primary_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let primary_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(DbConfigError::Missing {
                key: "DATABASE_URL",
            })?;

        let max_connections = env_u32("DATABASE_MAX_CONNECTIONS", 10);
        let acquire_timeout = Duration::from_millis(env_u64("DATABASE_ACQUIRE_TIMEOUT_MS", 5000));

        Ok(Self {
            primary_url,
            max_connections,
            acquire_timeout,
        })
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("missing required environment variable {key}")]
    Missing { key: &'static str },
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}
