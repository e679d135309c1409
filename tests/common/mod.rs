#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cinema_booking::auth::JwtVerifier;
use cinema_booking::ledger::{LedgerError, LedgerTransaction, MemorySeatLedger, SeatLedger};
use cinema_booking::models::{BookTicketRequest, Money, Seat, SeatAvailability, SeatStatus, Showtime};
use cinema_booking::owners::MemoryOwnerDirectory;
use cinema_booking::services::verification::MemoryVerificationStore;
use cinema_booking::services::{BookingService, VerificationService};
use cinema_booking::AppState;

pub const SECRET: &str = "integration-test-secret";

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    email: &'a str,
    exp: i64,
}

pub fn token_expiring_in(subject: &str, ttl: Duration) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: subject,
            email: "user@example.com",
            exp: (Utc::now() + ttl).timestamp(),
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn valid_token(subject: &str) -> String {
    token_expiring_in(subject, Duration::minutes(120))
}

pub fn expired_token(subject: &str) -> String {
    token_expiring_in(subject, Duration::minutes(-5))
}

pub fn money(amount: &str) -> Money {
    amount.parse().unwrap()
}

pub fn seat_ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

pub fn request(showtime_id: &str, seats: &[&str]) -> BookTicketRequest {
    BookTicketRequest {
        showtime_id: showtime_id.to_string(),
        seat: seat_ids(seats),
    }
}

pub fn showtime(id: &str) -> Showtime {
    Showtime {
        id: id.to_string(),
        movie_id: "movie-1".to_string(),
        cinema_id: "cinema-1".to_string(),
        starts_at: Utc.with_ymd_and_hms(2026, 11, 1, 19, 30, 0).unwrap(),
    }
}

/// Обёртка над реестром, считающая обращения к нему.
#[derive(Clone)]
pub struct SpyLedger {
    inner: MemorySeatLedger,
    pub begins: Arc<AtomicUsize>,
    pub queries: Arc<AtomicUsize>,
}

impl SpyLedger {
    pub fn new(inner: MemorySeatLedger) -> Self {
        Self {
            inner,
            begins: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.begins.load(Ordering::SeqCst) + self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeatLedger for SpyLedger {
    async fn query_availability(
        &self,
        showtime_id: &str,
        seat_ids: &[String],
    ) -> Result<SeatAvailability, LedgerError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_availability(showtime_id, seat_ids).await
    }

    async fn list_seats(&self, showtime_id: &str) -> Result<Vec<SeatStatus>, LedgerError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.list_seats(showtime_id).await
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, LedgerError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.inner.begin().await
    }
}

/// Сеанс S1: A1 за 10.00, A2 за 12.50. Пользователь alice.
pub struct Fixture {
    pub ledger: MemorySeatLedger,
    pub spy: SpyLedger,
    pub owners: MemoryOwnerDirectory,
    pub service: BookingService,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_seats("S1", &[("A1", "10.00"), ("A2", "12.50")]).await
    }

    pub async fn with_seats(showtime_id: &str, seats: &[(&str, &str)]) -> Self {
        let ledger = MemorySeatLedger::new();
        let seats: Vec<Seat> = seats
            .iter()
            .map(|(id, price)| Seat::new(*id, money(price)))
            .collect();
        ledger.schedule(&showtime(showtime_id), &seats).await;

        let owners = MemoryOwnerDirectory::new();
        owners.insert("alice", "alice").await;
        owners.insert("bob-id", "bob").await;

        let spy = SpyLedger::new(ledger.clone());
        let service = BookingService::new(
            Arc::new(spy.clone()),
            Arc::new(JwtVerifier::new(SECRET, 0)),
            Arc::new(owners.clone()),
        );

        Self {
            ledger,
            spy,
            owners,
            service,
        }
    }

    pub fn app_state(&self) -> Arc<AppState> {
        let verification = VerificationService::with_ttl(
            Arc::new(MemoryVerificationStore::new()),
            Duration::seconds(60),
        );
        AppState::new(self.service.clone(), verification)
    }

    /// Занятые места совпадают с местами, на которые есть билеты.
    pub async fn assert_no_orphans(&self, showtime_id: &str) {
        let unavailable = self.ledger.unavailable_seats(showtime_id).await;
        let ticketed: std::collections::BTreeSet<String> = self
            .ledger
            .tickets()
            .await
            .into_iter()
            .filter(|t| t.showtime_id == showtime_id)
            .map(|t| t.seat_id)
            .collect();
        assert_eq!(unavailable, ticketed);
    }
}
