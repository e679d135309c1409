use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Пул соединений с PostgreSQL, где живут места, сеансы и билеты.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        info!(pool_size = config.pool_size, "Database pool ready");
        Ok(Database { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Database { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Applying cinema schema migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Cinema schema is up to date");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }
}
