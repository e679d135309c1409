use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::BookingError;
use crate::middleware::BearerCredential;
use crate::models::{BookTicketRequest, Money};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/booking/ticket", post(book_ticket))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookTicketResponse {
    message: &'static str,
    count: usize,
    user_name: String,
    request: BookTicketRequest,
    sum_total: Money,
}

// POST /api/booking/ticket
async fn book_ticket(
    State(state): State<Arc<AppState>>,
    credential: BearerCredential,
    body: Result<Json<BookTicketRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BookingError> {
    // Битое тело - это 400 в общем формате ошибок, а не текст от axum
    let Json(request) = body.map_err(|rejection| BookingError::InvalidRequest(rejection.body_text()))?;

    let receipt = state
        .booking
        .book_ticket(request, credential.as_deref())
        .await?;

    Ok((
        StatusCode::OK,
        Json(BookTicketResponse {
            message: "Booking successful",
            count: receipt.count,
            user_name: receipt.user_name,
            request: receipt.request,
            sum_total: receipt.sum_total,
        }),
    ))
}
