use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub owner_name: String,
    pub seat_id: String,
    pub showtime_id: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

/// Билет, который ещё не записан в хранилище.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub owner_name: String,
    pub seat_id: String,
    pub showtime_id: String,
    pub price: Money,
}

impl NewTicket {
    pub fn into_ticket(self, created_at: DateTime<Utc>) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            owner_name: self.owner_name,
            seat_id: self.seat_id,
            showtime_id: self.showtime_id,
            price: self.price,
            created_at,
        }
    }
}
