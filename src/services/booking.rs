//! booking.rs
//!
//! Оркестратор покупки билетов. Порядок шагов важен:
//! 1.  Проверка формы запроса (без побочных эффектов).
//! 2.  Проверка токена, ровно один вызов верификатора, до обращения к реестру.
//! 3.  Поиск имени владельца.
//! 4.  Захват мест в транзакции реестра: всё или ничего.
//! 5.  Запись билетов в той же транзакции и коммит.
//! 6.  Сумма цен в `Money`.
//!
//! Любая ошибка до коммита откатывает и захват, и билеты.

use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationErrors};

use crate::auth::{AuthVerifier, VerifiedSubject};
use crate::error::{AuthFailure, BookingError};
use crate::ledger::{ClaimOutcome, SeatLedger};
use crate::models::{BookTicketRequest, BookingReceipt, Money, NewTicket, SeatAvailability, SeatStatus};
use crate::owners::OwnerDirectory;

#[derive(Clone)]
pub struct BookingService {
    ledger: Arc<dyn SeatLedger>,
    verifier: Arc<dyn AuthVerifier>,
    owners: Arc<dyn OwnerDirectory>,
}

impl BookingService {
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        verifier: Arc<dyn AuthVerifier>,
        owners: Arc<dyn OwnerDirectory>,
    ) -> Self {
        Self {
            ledger,
            verifier,
            owners,
        }
    }

    /// Пустой или отсутствующий токен отклоняется без вызова верификатора.
    pub fn authenticate(&self, credential: Option<&str>) -> Result<VerifiedSubject, BookingError> {
        let credential = match credential.map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => return Err(BookingError::Unauthorized(AuthFailure::Missing)),
        };

        self.verifier.verify(credential).map_err(|rejection| {
            debug!(reason = %rejection, "Credential rejected");
            BookingError::Unauthorized(rejection.into())
        })
    }

    #[tracing::instrument(
        skip_all,
        fields(showtime_id = %request.showtime_id, seats = request.seat.len())
    )]
    pub async fn book_ticket(
        &self,
        request: BookTicketRequest,
        credential: Option<&str>,
    ) -> Result<BookingReceipt, BookingError> {
        // 1. Форма запроса
        request
            .validate()
            .map_err(|errors| BookingError::InvalidRequest(validation_message(&errors)))?;

        // 2. Токен
        let subject = self.authenticate(credential)?;

        // 3. Владелец
        let user_name = self
            .owners
            .display_name(&subject.subject_id)
            .await
            .map_err(|e| BookingError::StorageFailure(e.to_string()))?;
        let Some(user_name) = user_name else {
            warn!("Authenticated subject has no user record");
            return Err(BookingError::OwnerNotFound);
        };

        // 4. Атомарный захват
        let mut tx = self.ledger.begin().await?;
        let claimed = match tx.claim_seats(&request.showtime_id, &request.seat).await? {
            ClaimOutcome::Claimed(claimed) => claimed,
            ClaimOutcome::PartiallyUnavailable(unavailable) => {
                info!(unavailable = ?unavailable, "Seats are not available");
                return Err(BookingError::SeatsUnavailable(unavailable));
            }
        };

        let sum_total = Money::checked_sum(claimed.iter().map(|seat| seat.price))
            .ok_or_else(|| BookingError::Unexpected("seat price total overflowed".to_string()))?;

        // 5. Билеты в той же транзакции
        let new_tickets = claimed
            .into_iter()
            .map(|seat| NewTicket {
                owner_name: user_name.clone(),
                seat_id: seat.seat_id,
                showtime_id: request.showtime_id.clone(),
                price: seat.price,
            })
            .collect();
        let tickets = tx.insert_tickets(new_tickets).await?;
        tx.commit().await?;

        info!(count = tickets.len(), total = %sum_total, "Booking successful");

        // 6. Результат
        Ok(BookingReceipt {
            count: tickets.len(),
            user_name,
            sum_total,
            request,
            tickets,
        })
    }

    /// Доступность мест для авторизованного клиента.
    pub async fn query_availability(
        &self,
        showtime_id: &str,
        seat_ids: &[String],
        credential: Option<&str>,
    ) -> Result<SeatAvailability, BookingError> {
        if showtime_id.trim().is_empty() || seat_ids.is_empty() {
            return Err(BookingError::InvalidRequest(
                "showtimeId and at least one seat are required".to_string(),
            ));
        }
        self.authenticate(credential)?;

        Ok(self.ledger.query_availability(showtime_id, seat_ids).await?)
    }

    /// Полный список мест сеанса. Сеанс без мест неотличим от несуществующего: 404.
    pub async fn list_seats(
        &self,
        showtime_id: &str,
        credential: Option<&str>,
    ) -> Result<Vec<SeatStatus>, BookingError> {
        if showtime_id.trim().is_empty() {
            return Err(BookingError::InvalidRequest(
                "showtimeId must not be blank".to_string(),
            ));
        }
        self.authenticate(credential)?;

        let seats = self.ledger.list_seats(showtime_id).await?;
        if seats.is_empty() {
            debug!(showtime_id, "No seats for showtime");
            return Err(BookingError::ShowtimeNotFound(showtime_id.to_string()));
        }
        Ok(seats)
    }
}

fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
