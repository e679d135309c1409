pub mod auth;
pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod owners;
pub mod redis_client;
pub mod services;

use anyhow::Context;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::JwtVerifier;
use crate::ledger::PgSeatLedger;
use crate::owners::PgOwnerDirectory;
use crate::services::{BookingService, VerificationService};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub booking: BookingService,
    pub verification: VerificationService,
}

impl AppState {
    pub fn new(booking: BookingService, verification: VerificationService) -> Arc<Self> {
        Arc::new(Self {
            booking,
            verification,
        })
    }

    /// Production-сборка: PostgreSQL для реестра и владельцев, Redis для
    /// подтверждений email, JWT для токенов.
    pub async fn connect(config: &config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        db.ping().await.context("database did not answer SELECT 1")?;
        db.run_migrations()
            .await
            .context("failed to run migrations")?;

        let redis = redis_client::RedisClient::connect(&config.redis)
            .await
            .context("failed to connect to Redis")?;
        redis.ping().await.context("Redis did not answer PING")?;
        info!("Redis connected");

        let booking = BookingService::new(
            Arc::new(PgSeatLedger::new(&db, &config.booking)),
            Arc::new(JwtVerifier::from_config(&config.jwt)),
            Arc::new(PgOwnerDirectory::new(&db)),
        );
        let verification = VerificationService::new(
            Arc::new(cache::CacheService::new(redis)),
            &config.verification,
        );

        Ok(Self::new(booking, verification))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
