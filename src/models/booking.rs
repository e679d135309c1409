use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationError};

use super::{Money, Ticket};

/// Тело запроса на покупку билетов.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookTicketRequest {
    #[validate(custom(function = "validate_showtime_id"))]
    pub showtime_id: String,
    #[validate(
        length(min = 1, message = "seat must contain at least one seat id"),
        custom(function = "validate_seat_ids")
    )]
    pub seat: Vec<String>,
}

fn validate_showtime_id(showtime_id: &str) -> Result<(), ValidationError> {
    if showtime_id.trim().is_empty() {
        return Err(ValidationError::new("blank_showtime_id")
            .with_message("showtimeId must not be empty".into()));
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn validate_seat_ids(seats: &Vec<String>) -> Result<(), ValidationError> {
    if seats.iter().any(|s| s.trim().is_empty()) {
        return Err(ValidationError::new("empty_seat_id")
            .with_message("seat ids must not be empty".into()));
    }

    let mut seen = HashSet::with_capacity(seats.len());
    for seat_id in seats {
        if !seen.insert(seat_id.as_str()) {
            return Err(ValidationError::new("duplicate_seat_id")
                .with_message(format!("seat {} is requested more than once", seat_id).into()));
        }
    }
    Ok(())
}

/// Результат успешной покупки.
#[derive(Debug, Clone)]
pub struct BookingReceipt {
    pub count: usize,
    pub user_name: String,
    pub sum_total: Money,
    pub request: BookTicketRequest,
    pub tickets: Vec<Ticket>,
}
