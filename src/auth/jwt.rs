//! HS256 JWT: `sub` — идентификатор пользователя, `exp` — срок действия.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::{AuthRejection, AuthVerifier, VerifiedSubject};
use crate::config::JwtConfig;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, config.leeway_seconds)
    }
}

impl AuthVerifier for JwtVerifier {
    fn verify(&self, credential: &str) -> Result<VerifiedSubject, AuthRejection> {
        let data = decode::<Claims>(credential, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthRejection::Expired,
                _ => {
                    tracing::debug!(error = %e, "Token verification failed");
                    AuthRejection::Invalid
                }
            }
        })?;

        let expires_at =
            DateTime::<Utc>::from_timestamp(data.claims.exp, 0).ok_or(AuthRejection::Invalid)?;

        if data.claims.sub.is_empty() {
            return Err(AuthRejection::Invalid);
        }

        Ok(VerifiedSubject {
            subject_id: data.claims.sub,
            expires_at,
        })
    }
}
