//! Library circulation service
//!
//! The circulation subsystem of the institutional administration backend:
//! book catalog, student borrow requests and the physical issue/return
//! ledger, exposed as a REST JSON API. Identity and role management are
//! external; this service only consumes `{id, role}` principals.

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
