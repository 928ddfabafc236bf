//! Expense tracking HTTP service: filtered listing, monthly statistics,
//! category breakdowns and CSV export over per-user expenses.

pub mod app;
pub mod auth;
pub mod categories;
pub mod config;
pub mod db;
pub mod error;
pub mod expenses;
pub mod reports;
pub mod state;

#[cfg(test)]
pub(crate) mod test_utils;

pub use app::{build_app, serve};
pub use state::AppState;
