//! Lectern Library Circulation Management System
//!
//! A Rust implementation of the Lectern library circulation server,
//! providing a REST JSON API for the catalog, physical copy inventory,
//! borrow/donation requests, and the issuance ledger.

use std::sync::Arc;

use sqlx::{Pool, Postgres};

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
    pub pool: Pool<Postgres>,
}
