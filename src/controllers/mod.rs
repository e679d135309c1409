pub mod booking;
pub mod seats;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(booking::routes())
        .merge(seats::routes())
}
