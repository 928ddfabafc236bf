pub mod breakdown;
pub mod chart;
pub mod export;
pub mod handlers;
pub mod month;
pub mod statistics;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::report_routes()
}
