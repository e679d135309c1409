use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Сеанс. В рамках ядра бронирования не изменяется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    pub id: String,
    pub movie_id: String,
    pub cinema_id: String,
    pub starts_at: DateTime<Utc>,
}
