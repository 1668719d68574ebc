use crate::config::parse_or;
use crate::core::{AppError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(DatabaseConfig {
            url: lookup("DATABASE_URL")
                .ok_or_else(|| AppError::configuration("DATABASE_URL not set"))?,
            pool_size: parse_or(lookup, "DATABASE_POOL_SIZE", 10)?,
            max_connections: parse_or(lookup, "DATABASE_MAX_CONNECTIONS", 20)?,
        })
    }

    /// Create the PostgreSQL connection pool shared by request sessions
    pub async fn create_pool(&self) -> Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.pool_size)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // 30 minutes
            .test_before_acquire(true)
            .connect(&self.url)
            .await
            .map_err(AppError::Database)
    }

    /// Single connection without idle keep-alive, for one-shot scripts
    pub async fn create_single_connection_pool(&self) -> Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .idle_timeout(Duration::from_secs(1))
            .acquire_timeout(Duration::from_secs(30))
            .connect(&self.url)
            .await
            .map_err(AppError::Database)
    }
}
