//! Axum HTTP API server.
//!
//! This crate provides:
//! - Upload initiation, confirmation and status polling for videos
//! - Knowledge-base search and indexing over vector embeddings
//! - Rate limiting, security headers and request ids
//! - Prometheus metrics

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
