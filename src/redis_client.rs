use redis::{aio::ConnectionManager, Client};

use crate::config::RedisConfig;

/// Соединение с Redis. `ConnectionManager` сам переподключается после обрыва,
/// клоны разделяют одно мультиплексированное соединение.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(config: &RedisConfig) -> redis::RedisResult<Self> {
        let client = Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(RedisClient { conn })
    }

    pub async fn ping(&self) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await.map(|_| ())
    }
}
