//! Axum HTTP server for the pizza counter.
//!
//! This crate provides:
//! - The upload page, `/process` and report download routes
//! - Static serving of annotated results and cached reports
//! - Health, readiness and Prometheus metrics endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
