use crate::redis_client::RedisClient;

pub mod verification;

/// Redis-хранилище для короткоживущих записей сервиса.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
}

impl CacheService {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}
