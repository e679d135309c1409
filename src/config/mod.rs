use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub booking: BookingConfig,
    pub verification: VerificationConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub leeway_seconds: u64,
}

// Настройки захвата мест
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Сколько транзакция ждёт блокировку строк мест, прежде чем сдаться.
    pub claim_lock_timeout_ms: u64,
}

// Настройки подтверждения email
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub ttl_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn or_default(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = or_default(name, default);
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let log_format = match or_default("LOG_FORMAT", "text").to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            app: AppConfig {
                host: or_default("HOST", "0.0.0.0"),
                port: parsed("PORT", "8000")?,
                environment: or_default("ENVIRONMENT", "development"),
                rust_log: or_default("RUST_LOG", "cinema_booking=debug,tower_http=debug"),
                log_format,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed("DB_POOL_SIZE", "20")?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                leeway_seconds: parsed("JWT_LEEWAY_SECONDS", "0")?,
            },
            booking: BookingConfig {
                claim_lock_timeout_ms: parsed("CLAIM_LOCK_TIMEOUT_MS", "5000")?,
            },
            verification: VerificationConfig {
                ttl_seconds: parsed("VERIFICATION_TTL_SECONDS", "60")?,
            },
        })
    }
}
