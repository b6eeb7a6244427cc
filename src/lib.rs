//! finance_tracker Library
//!
//! Personal finance tracking backend: token authentication plus
//! ownership-scoped repositories for categories, merchants, budgets and
//! transactions. Re-exports modules for integration testing and the binary.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod repository;

mod error;

pub use api::AppState;
pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
