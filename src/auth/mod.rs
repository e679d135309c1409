//! Проверка учётных данных клиента.
//!
//! Ядро бронирования не знает формата токена: оно только вызывает
//! [`AuthVerifier::verify`] и интерпретирует результат.

pub mod jwt;

use chrono::{DateTime, Utc};
use std::fmt;

pub use jwt::JwtVerifier;

/// Субъект, подтверждённый проверкой токена.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSubject {
    pub subject_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Почему токен не принят.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Повреждённый токен или неверная подпись.
    Invalid,
    /// Токен корректен, но срок действия истёк.
    Expired,
}

impl fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthRejection::Invalid => write!(f, "invalid credential"),
            AuthRejection::Expired => write!(f, "expired credential"),
        }
    }
}

/// Проверка токена. Реализация не должна иметь побочных эффектов:
/// для одного и того же токена в один и тот же момент ответ одинаков.
pub trait AuthVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<VerifiedSubject, AuthRejection>;
}
