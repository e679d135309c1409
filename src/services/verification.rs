//! Подтверждение email при регистрации.
//!
//! Ожидающее подтверждение - отдельная запись с ключом email и сроком
//! действия, а не общее состояние сервиса: параллельные регистрации не
//! видят и не перетирают коды друг друга. Хранится только хеш кода.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::VerificationConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerification {
    pub email: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("no pending verification for this email")]
    NotFound,
    #[error("verification timed out")]
    Expired,
    #[error("invalid verification number")]
    InvalidCode,
    #[error("verification store error: {0}")]
    Store(String),
}

#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn put(&self, record: PendingVerification, ttl: Duration) -> Result<(), VerificationError>;

    /// Достаёт и удаляет запись одной операцией: код нельзя проверить дважды.
    async fn take(&self, email: &str) -> Result<Option<PendingVerification>, VerificationError>;
}

#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn VerificationStore>,
    ttl: Duration,
}

impl VerificationService {
    pub fn new(store: Arc<dyn VerificationStore>, config: &VerificationConfig) -> Self {
        let ttl = i64::try_from(config.ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::seconds(60));
        Self::with_ttl(store, ttl)
    }

    pub fn with_ttl(store: Arc<dyn VerificationStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Создаёт (или заменяет) ожидающую запись и возвращает код для отправки письмом.
    pub async fn issue(&self, email: &str) -> Result<String, VerificationError> {
        let email = normalize_email(email);
        let code = generate_code();

        let record = PendingVerification {
            code_hash: hash_code(&email, &code),
            expires_at: Utc::now() + self.ttl,
            email: email.clone(),
        };
        self.store.put(record, self.ttl).await?;

        info!(ttl_seconds = self.ttl.num_seconds(), "Verification code issued");
        Ok(code)
    }

    /// Проверяет код. Запись расходуется при любом исходе, как и в регистрации:
    /// неверный код требует нового запроса.
    pub async fn confirm(&self, email: &str, code: &str) -> Result<(), VerificationError> {
        let email = normalize_email(email);
        let record = self
            .store
            .take(&email)
            .await?
            .ok_or(VerificationError::NotFound)?;

        if Utc::now() >= record.expires_at {
            return Err(VerificationError::Expired);
        }
        if hash_code(&email, code.trim()) != record.code_hash {
            warn!("Verification code mismatch");
            return Err(VerificationError::InvalidCode);
        }

        info!("Email verified");
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Семизначный код, 1000000..=9999999.
fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(1_000_000..=9_999_999);
    code.to_string()
}

fn hash_code(email: &str, code: &str) -> String {
    let digest = Sha256::new()
        .chain_update(email.as_bytes())
        .chain_update(b":")
        .chain_update(code.as_bytes())
        .finalize();
    hex::encode(digest)
}

/// Хранилище в памяти процесса.
#[derive(Clone, Default)]
pub struct MemoryVerificationStore {
    records: Arc<Mutex<HashMap<String, PendingVerification>>>,
}

impl MemoryVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn put(&self, record: PendingVerification, _ttl: Duration) -> Result<(), VerificationError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| VerificationError::Store("verification store poisoned".to_string()))?;
        records.insert(record.email.clone(), record);
        Ok(())
    }

    async fn take(&self, email: &str) -> Result<Option<PendingVerification>, VerificationError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| VerificationError::Store("verification store poisoned".to_string()))?;
        Ok(records.remove(email))
    }
}
