//! Реестр мест в памяти процесса: для тестов и локального запуска без базы.
//!
//! Транзакция держит владеющую блокировку всего реестра, изменения копятся
//! в транзакции и применяются только в `commit`. Подходит для одного процесса;
//! между экземплярами сервиса атомарность даёт только PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ClaimOutcome, ClaimedSeat, LedgerError, LedgerTransaction, SeatLedger};
use crate::models::{Money, NewTicket, Seat, SeatAvailability, SeatStatus, Showtime, Ticket};

type SeatKey = (String, String);

#[derive(Debug, Clone, Copy)]
struct SeatRow {
    available: bool,
    price: Money,
}

#[derive(Debug, Default)]
struct LedgerState {
    seats: HashMap<SeatKey, SeatRow>,
    tickets: Vec<Ticket>,
}

#[derive(Clone, Default)]
pub struct MemorySeatLedger {
    state: Arc<Mutex<LedgerState>>,
    fail_next_ticket_insert: Arc<AtomicBool>,
}

impl MemorySeatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует сеанс со свободными местами. Уже существующие места не трогает.
    pub async fn schedule(&self, showtime: &Showtime, seats: &[Seat]) {
        let mut state = self.state.lock().await;
        for seat in seats {
            state
                .seats
                .entry((showtime.id.clone(), seat.id.clone()))
                .or_insert(SeatRow {
                    available: true,
                    price: seat.price,
                });
        }
    }

    /// Следующая запись билетов завершится ошибкой хранилища.
    pub fn fail_next_ticket_insert(&self) {
        self.fail_next_ticket_insert.store(true, Ordering::SeqCst);
    }

    pub async fn tickets(&self) -> Vec<Ticket> {
        self.state.lock().await.tickets.clone()
    }

    /// Все занятые места сеанса.
    pub async fn unavailable_seats(&self, showtime_id: &str) -> BTreeSet<String> {
        let state = self.state.lock().await;
        state
            .seats
            .iter()
            .filter(|((showtime, _), row)| showtime == showtime_id && !row.available)
            .map(|((_, seat), _)| seat.clone())
            .collect()
    }
}

#[async_trait]
impl SeatLedger for MemorySeatLedger {
    async fn query_availability(
        &self,
        showtime_id: &str,
        seat_ids: &[String],
    ) -> Result<SeatAvailability, LedgerError> {
        let state = self.state.lock().await;
        Ok(seat_ids
            .iter()
            .map(|seat_id| {
                let available = state
                    .seats
                    .get(&(showtime_id.to_string(), seat_id.clone()))
                    .map(|row| row.available)
                    .unwrap_or(false);
                (seat_id.clone(), available)
            })
            .collect())
    }

    async fn list_seats(&self, showtime_id: &str) -> Result<Vec<SeatStatus>, LedgerError> {
        let state = self.state.lock().await;
        let mut seats: Vec<SeatStatus> = state
            .seats
            .iter()
            .filter(|((showtime, _), _)| showtime == showtime_id)
            .map(|((_, seat_id), row)| SeatStatus {
                seat_id: seat_id.clone(),
                is_available: row.available,
            })
            .collect();
        seats.sort_by(|a, b| a.seat_id.cmp(&b.seat_id));
        Ok(seats)
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, LedgerError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryLedgerTransaction {
            guard,
            claimed: HashSet::new(),
            tickets: Vec::new(),
            fail_ticket_insert: self.fail_next_ticket_insert.clone(),
        }))
    }
}

pub struct MemoryLedgerTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    claimed: HashSet<SeatKey>,
    tickets: Vec<Ticket>,
    fail_ticket_insert: Arc<AtomicBool>,
}

#[async_trait]
impl LedgerTransaction for MemoryLedgerTransaction {
    async fn claim_seats(
        &mut self,
        showtime_id: &str,
        seat_ids: &[String],
    ) -> Result<ClaimOutcome, LedgerError> {
        let mut claimed = Vec::with_capacity(seat_ids.len());
        let mut unavailable = Vec::new();
        let mut seen = HashSet::with_capacity(seat_ids.len());

        for seat_id in seat_ids {
            if !seen.insert(seat_id.as_str()) {
                continue;
            }
            let key = (showtime_id.to_string(), seat_id.clone());
            match self.guard.seats.get(&key) {
                Some(row) if row.available && !self.claimed.contains(&key) => {
                    claimed.push(ClaimedSeat {
                        seat_id: seat_id.clone(),
                        price: row.price,
                    });
                }
                _ => unavailable.push(seat_id.clone()),
            }
        }

        if !unavailable.is_empty() {
            return Ok(ClaimOutcome::PartiallyUnavailable(unavailable));
        }

        for seat in &claimed {
            self.claimed
                .insert((showtime_id.to_string(), seat.seat_id.clone()));
        }
        Ok(ClaimOutcome::Claimed(claimed))
    }

    async fn insert_tickets(&mut self, tickets: Vec<NewTicket>) -> Result<Vec<Ticket>, LedgerError> {
        if self.fail_ticket_insert.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Backend("ticket insert failed".to_string()));
        }

        let created_at = Utc::now();
        let mut inserted = Vec::with_capacity(tickets.len());
        for new_ticket in tickets {
            let key = (new_ticket.showtime_id.clone(), new_ticket.seat_id.clone());
            // Билет только на место, захваченное в этой же транзакции
            if !self.claimed.contains(&key) {
                return Err(LedgerError::Conflict(format!(
                    "seat {} was not claimed in this transaction",
                    new_ticket.seat_id
                )));
            }
            inserted.push(new_ticket.into_ticket(created_at));
        }

        self.tickets.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let MemoryLedgerTransaction {
            mut guard,
            claimed,
            tickets,
            ..
        } = *self;

        for key in &claimed {
            if let Some(row) = guard.seats.get_mut(key) {
                row.available = false;
            }
        }
        guard.tickets.extend(tickets);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn showtime(id: &str) -> Showtime {
        Showtime {
            id: id.to_string(),
            movie_id: "m1".to_string(),
            cinema_id: "c1".to_string(),
            starts_at: Utc.with_ymd_and_hms(2026, 11, 1, 19, 30, 0).unwrap(),
        }
    }

    fn ids(seats: &[&str]) -> Vec<String> {
        seats.iter().map(|s| s.to_string()).collect()
    }

    async fn ledger() -> MemorySeatLedger {
        let ledger = MemorySeatLedger::new();
        ledger
            .schedule(
                &showtime("S1"),
                &[
                    Seat::new("A1", Money::from_minor(1000)),
                    Seat::new("A2", Money::from_minor(1250)),
                ],
            )
            .await;
        ledger
    }

    #[tokio::test]
    async fn uncommitted_claim_is_rolled_back() {
        let ledger = ledger().await;

        {
            let mut tx = ledger.begin().await.unwrap();
            let outcome = tx.claim_seats("S1", &ids(&["A1"])).await.unwrap();
            assert!(matches!(outcome, ClaimOutcome::Claimed(_)));
        }

        let availability = ledger.query_availability("S1", &ids(&["A1"])).await.unwrap();
        assert_eq!(availability.get("A1"), Some(&true));
    }

    #[tokio::test]
    async fn unknown_seat_fails_whole_claim() {
        let ledger = ledger().await;

        let mut tx = ledger.begin().await.unwrap();
        let outcome = tx.claim_seats("S1", &ids(&["A1", "Z9"])).await.unwrap();
        assert_eq!(outcome, ClaimOutcome::PartiallyUnavailable(ids(&["Z9"])));
        tx.commit().await.unwrap();

        assert!(ledger.unavailable_seats("S1").await.is_empty());
    }

    #[tokio::test]
    async fn tickets_require_a_claim_in_the_same_transaction() {
        let ledger = ledger().await;

        let mut tx = ledger.begin().await.unwrap();
        let err = tx
            .insert_tickets(vec![NewTicket {
                owner_name: "alice".to_string(),
                seat_id: "A1".to_string(),
                showtime_id: "S1".to_string(),
                price: Money::from_minor(1000),
            }])
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_seats_is_sorted_and_scoped_to_the_showtime() {
        let ledger = ledger().await;
        ledger
            .schedule(&showtime("S2"), &[Seat::new("Z1", Money::from_minor(500))])
            .await;

        let mut tx = ledger.begin().await.unwrap();
        tx.claim_seats("S1", &ids(&["A2"])).await.unwrap();
        tx.commit().await.unwrap();

        let seats = ledger.list_seats("S1").await.unwrap();
        assert_eq!(
            seats,
            vec![
                SeatStatus { seat_id: "A1".to_string(), is_available: true },
                SeatStatus { seat_id: "A2".to_string(), is_available: false },
            ]
        );
        assert!(ledger.list_seats("NOPE").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn availability_reports_unknown_seats_as_taken() {
        let ledger = ledger().await;

        let availability = ledger
            .query_availability("S1", &ids(&["A1", "B7"]))
            .await
            .unwrap();

        assert_eq!(availability.get("A1"), Some(&true));
        assert_eq!(availability.get("B7"), Some(&false));
    }
}
