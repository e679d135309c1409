use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: String,
    pub price: Money,
}

impl Seat {
    pub fn new(id: impl Into<String>, price: Money) -> Self {
        Self { id: id.into(), price }
    }
}

/// Снимок доступности: seat_id -> свободно ли место.
/// Несуществующие места попадают сюда как `false`.
pub type SeatAvailability = BTreeMap<String, bool>;

/// Место сеанса в общем списке.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatStatus {
    pub seat_id: String,
    pub is_available: bool,
}
