//! Реестр мест в PostgreSQL.
//!
//! Захват берёт строковые блокировки `FOR UPDATE` ровно на запрошенные строки
//! `showtime_seats`, всегда в порядке `seat_id`, поэтому две транзакции с
//! пересекающимися наборами мест выстраиваются в очередь, а не в дедлок.
//! Непересекающиеся наборы не мешают друг другу, даже на одном сеансе.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use super::{ClaimOutcome, ClaimedSeat, LedgerError, LedgerTransaction, SeatLedger};
use crate::config::BookingConfig;
use crate::database::Database;
use crate::models::{Money, NewTicket, SeatAvailability, SeatStatus, Ticket};

#[derive(Clone)]
pub struct PgSeatLedger {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgSeatLedger {
    pub fn new(db: &Database, config: &BookingConfig) -> Self {
        Self {
            pool: db.pool.clone(),
            lock_timeout_ms: config.claim_lock_timeout_ms,
        }
    }
}

#[async_trait]
impl SeatLedger for PgSeatLedger {
    async fn query_availability(
        &self,
        showtime_id: &str,
        seat_ids: &[String],
    ) -> Result<SeatAvailability, LedgerError> {
        let rows: Vec<(String, bool)> = sqlx::query_as(
            "SELECT seat_id, is_available
             FROM showtime_seats
             WHERE showtime_id = $1 AND seat_id = ANY($2)",
        )
        .bind(showtime_id)
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await?;

        // Места, которых нет в реестре, считаются недоступными
        let mut availability: SeatAvailability =
            seat_ids.iter().map(|id| (id.clone(), false)).collect();
        availability.extend(rows);
        Ok(availability)
    }

    async fn list_seats(&self, showtime_id: &str) -> Result<Vec<SeatStatus>, LedgerError> {
        let rows: Vec<(String, bool)> = sqlx::query_as(
            "SELECT seat_id, is_available
             FROM showtime_seats
             WHERE showtime_id = $1
             ORDER BY seat_id",
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(seat_id, is_available)| SeatStatus {
                seat_id,
                is_available,
            })
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // SET LOCAL не принимает параметры; значение - число из конфига
        let stmt = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms);
        sqlx::query(&stmt).execute(&mut *tx).await?;

        Ok(Box::new(PgLedgerTransaction { tx }))
    }
}

pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn claim_seats(
        &mut self,
        showtime_id: &str,
        seat_ids: &[String],
    ) -> Result<ClaimOutcome, LedgerError> {
        let ordered: Vec<String> = seat_ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // 1) Блокируем адресованные строки и читаем цены в той же транзакции
        let rows: Vec<(String, bool, String)> = sqlx::query_as(
            r#"
            SELECT ss.seat_id, ss.is_available, s.price::TEXT
            FROM showtime_seats ss
            JOIN seats s ON s.id = ss.seat_id
            WHERE ss.showtime_id = $1 AND ss.seat_id = ANY($2)
            ORDER BY ss.seat_id
            FOR UPDATE OF ss
            "#,
        )
        .bind(showtime_id)
        .bind(&ordered)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut claimable: HashMap<String, Money> = HashMap::with_capacity(rows.len());
        for (seat_id, is_available, price) in rows {
            if !is_available {
                continue;
            }
            let price = price.parse().map_err(|source| LedgerError::InvalidPrice {
                seat_id: seat_id.clone(),
                source,
            })?;
            claimable.insert(seat_id, price);
        }

        // 2) Хоть одно место занято или не существует - не меняем ничего
        let unavailable: Vec<String> = seat_ids
            .iter()
            .filter(|id| !claimable.contains_key(id.as_str()))
            .cloned()
            .collect();
        if !unavailable.is_empty() {
            debug!(
                showtime_id,
                unavailable = unavailable.len(),
                "Claim rejected, seats unavailable"
            );
            return Ok(ClaimOutcome::PartiallyUnavailable(unavailable));
        }

        // 3) Строки под нашей блокировкой, но условие is_available оставляем
        let updated = sqlx::query(
            r#"
            UPDATE showtime_seats
            SET is_available = FALSE
            WHERE showtime_id = $1 AND seat_id = ANY($2) AND is_available
            "#,
        )
        .bind(showtime_id)
        .bind(&ordered)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if updated != ordered.len() as u64 {
            warn!(
                showtime_id,
                expected = ordered.len(),
                updated,
                "Seat claim updated an unexpected number of rows"
            );
            return Err(LedgerError::Conflict(format!(
                "claimed {} of {} seats",
                updated,
                ordered.len()
            )));
        }

        let claimed = seat_ids
            .iter()
            .filter_map(|id| {
                claimable.get(id).map(|price| ClaimedSeat {
                    seat_id: id.clone(),
                    price: *price,
                })
            })
            .collect();

        Ok(ClaimOutcome::Claimed(claimed))
    }

    async fn insert_tickets(&mut self, tickets: Vec<NewTicket>) -> Result<Vec<Ticket>, LedgerError> {
        let created_at = Utc::now();
        let mut inserted = Vec::with_capacity(tickets.len());

        for new_ticket in tickets {
            let ticket = new_ticket.into_ticket(created_at);
            sqlx::query(
                r#"
                INSERT INTO tickets (id, user_name, seat_id, showtime_id, price, created_at)
                VALUES ($1, $2, $3, $4, $5::NUMERIC, $6)
                "#,
            )
            .bind(ticket.id)
            .bind(&ticket.owner_name)
            .bind(&ticket.seat_id)
            .bind(&ticket.showtime_id)
            .bind(ticket.price.to_string())
            .bind(ticket.created_at)
            .execute(&mut *self.tx)
            .await?;
            inserted.push(ticket);
        }

        Ok(inserted)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }
}
