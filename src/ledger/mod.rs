//! Реестр мест: кто и на каком сеансе может занять место.
//!
//! Единственная законная мутация реестра — захват ([`LedgerTransaction::claim_seats`]):
//! либо все запрошенные места переходят в «занято», либо ни одно.
//! Билеты пишутся в той же транзакции, поэтому не бывает занятого места без билета.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{money::MoneyParseError, Money, NewTicket, SeatAvailability, SeatStatus, Ticket};

pub use memory::MemorySeatLedger;
pub use postgres::PgSeatLedger;

/// Место, успешно захваченное в текущей транзакции, вместе с его ценой.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedSeat {
    pub seat_id: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Все места захвачены, в порядке запроса.
    Claimed(Vec<ClaimedSeat>),
    /// Ничего не изменено. Список мест, которые заняты или не существуют.
    PartiallyUnavailable(Vec<String>),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("timed out waiting for seat locks")]
    LockTimeout,
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
    #[error("seat {seat_id} has an invalid price: {source}")]
    InvalidPrice {
        seat_id: String,
        #[source]
        source: MoneyParseError,
    },
    #[error("ledger backend failure: {0}")]
    Backend(String),
}

impl LedgerError {
    /// Можно ли повторить всю операцию бронирования целиком.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LedgerError::InvalidPrice { .. })
    }
}

// SQLSTATE: 55P03 lock_not_available, 40001 serialization_failure, 40P01 deadlock_detected
impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned());

        match code.as_deref() {
            Some("55P03") => LedgerError::LockTimeout,
            Some("40001") | Some("40P01") => LedgerError::Conflict(err.to_string()),
            _ => LedgerError::Database(err),
        }
    }
}

#[async_trait]
pub trait SeatLedger: Send + Sync {
    /// Текущая доступность мест. Только для наблюдения: решение о захвате
    /// принимает исключительно `claim_seats`.
    async fn query_availability(
        &self,
        showtime_id: &str,
        seat_ids: &[String],
    ) -> Result<SeatAvailability, LedgerError>;

    /// Все места сеанса по возрастанию `seat_id`. Пустой список: сеанса нет
    /// или у него нет мест.
    async fn list_seats(&self, showtime_id: &str) -> Result<Vec<SeatStatus>, LedgerError>;

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, LedgerError>;
}

/// Транзакция реестра. Если её уничтожить без `commit`, захват и билеты откатываются.
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn claim_seats(
        &mut self,
        showtime_id: &str,
        seat_ids: &[String],
    ) -> Result<ClaimOutcome, LedgerError>;

    async fn insert_tickets(&mut self, tickets: Vec<NewTicket>) -> Result<Vec<Ticket>, LedgerError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;
}
