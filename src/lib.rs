//! Libris Library Desk
//!
//! REST JSON server for a small library desk: student and librarian
//! accounts, catalog search, borrowing and returns, overdue tracking with
//! SMS reminders, barcode scanning and reading recommendations.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
