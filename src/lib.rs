//! Readshelf personal library server
//!
//! Imports reading-tracker spreadsheet exports into a personal library:
//! tolerant CSV parsing, author/title/status normalization, duplicate
//! detection, optional metadata enrichment and collection creation, with
//! progress streamed to the caller and an audit record per run.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod csv_import;
pub mod error;
pub mod models;
pub mod normalize;
pub mod repository;
pub mod services;

#[cfg(test)]
pub mod test_support;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
