//! Справочник владельцев: идентификатор субъекта из токена -> отображаемое имя.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::Database;

#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    /// `None`, если пользователя больше нет.
    async fn display_name(&self, subject_id: &str) -> Result<Option<String>, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgOwnerDirectory {
    pool: PgPool,
}

impl PgOwnerDirectory {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }
}

#[async_trait]
impl OwnerDirectory for PgOwnerDirectory {
    async fn display_name(&self, subject_id: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT user_name FROM users WHERE id = $1")
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Справочник в памяти процесса на `tokio::sync::RwLock` (без отравления).
#[derive(Clone, Default)]
pub struct MemoryOwnerDirectory {
    names: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryOwnerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, subject_id: impl Into<String>, user_name: impl Into<String>) {
        self.names
            .write()
            .await
            .insert(subject_id.into(), user_name.into());
    }

    pub async fn remove(&self, subject_id: &str) {
        self.names.write().await.remove(subject_id);
    }
}

#[async_trait]
impl OwnerDirectory for MemoryOwnerDirectory {
    async fn display_name(&self, subject_id: &str) -> Result<Option<String>, sqlx::Error> {
        Ok(self.names.read().await.get(subject_id).cloned())
    }
}
