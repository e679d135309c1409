use async_trait::async_trait;
use chrono::Duration;
use redis::AsyncCommands;

use crate::cache::CacheService;
use crate::services::verification::{PendingVerification, VerificationError, VerificationStore};

fn verification_key(email: &str) -> String {
    format!("verification:{}", email)
}

fn store_error(e: impl std::fmt::Display) -> VerificationError {
    VerificationError::Store(e.to_string())
}

#[async_trait]
impl VerificationStore for CacheService {
    /// SET EX: Redis сам удалит запись по истечении срока
    async fn put(&self, record: PendingVerification, ttl: Duration) -> Result<(), VerificationError> {
        let data = serde_json::to_string(&record).map_err(store_error)?;
        let ttl_seconds = u64::try_from(ttl.num_seconds()).unwrap_or(0).max(1);
        let mut conn = self.redis.conn.clone();
        conn.set_ex::<_, _, ()>(verification_key(&record.email), data, ttl_seconds)
            .await
            .map_err(store_error)
    }

    /// GETDEL - атомарно, два параллельных подтверждения не получат одну запись
    async fn take(&self, email: &str) -> Result<Option<PendingVerification>, VerificationError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = redis::cmd("GETDEL")
            .arg(verification_key(email))
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;

        data.map(|json| serde_json::from_str(&json).map_err(store_error))
            .transpose()
    }
}
