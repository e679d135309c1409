use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::convert::Infallible;

/// Токен из заголовка Authorization: `Bearer <token>` или сам токен.
///
/// Экстрактор ничего не отклоняет: отсутствие токена - решение сервиса
/// бронирования, а не роутера, чтобы ошибка имела общий формат.
#[derive(Debug, Clone, Default)]
pub struct BearerCredential(pub Option<String>);

impl BearerCredential {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for BearerCredential {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                let value = value.trim();
                value
                    .strip_prefix("Bearer ")
                    .or_else(|| value.strip_prefix("bearer "))
                    .unwrap_or(value)
                    .trim()
                    .to_string()
            })
            .filter(|token| !token.is_empty());

        Ok(BearerCredential(token))
    }
}
