pub mod dispatch;
pub mod dto;
pub mod handlers;
pub mod repo;
pub mod schedule;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::notification_routes()
}
