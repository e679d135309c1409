use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::BookingError;
use crate::middleware::BearerCredential;
use crate::models::{SeatAvailability, SeatStatus};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats", get(get_seat_availability))
        .route("/seats/{showtime_id}", get(list_showtime_seats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeatsQuery {
    showtime_id: String,
    /// Через запятую: `A1,A2`
    seats: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeatsResponse {
    showtime_id: String,
    seats: SeatAvailability,
}

// GET /api/seats?showtimeId=S1&seats=A1,A2
async fn get_seat_availability(
    State(state): State<Arc<AppState>>,
    credential: BearerCredential,
    query: Result<Query<SeatsQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<impl IntoResponse, BookingError> {
    let Query(params) = query.map_err(|rejection| BookingError::InvalidRequest(rejection.body_text()))?;

    let seat_ids: Vec<String> = params
        .seats
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let seats = state
        .booking
        .query_availability(&params.showtime_id, &seat_ids, credential.as_deref())
        .await?;

    Ok(Json(SeatsResponse {
        showtime_id: params.showtime_id,
        seats,
    }))
}

// GET /api/seats/{showtime_id}
async fn list_showtime_seats(
    State(state): State<Arc<AppState>>,
    credential: BearerCredential,
    showtime_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<SeatStatus>>, BookingError> {
    let Path(showtime_id) =
        showtime_id.map_err(|rejection| BookingError::InvalidRequest(rejection.body_text()))?;

    let seats = state
        .booking
        .list_seats(&showtime_id, credential.as_deref())
        .await?;

    Ok(Json(seats))
}
