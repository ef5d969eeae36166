//! Axum HTTP/WS API server.
//!
//! This crate provides:
//! - REST endpoints for upload, settings, batch analysis and capture
//! - A WebSocket stream of session events
//! - Upload validation and temp-file storage
//! - Middleware (CORS, request IDs, logging, security headers)
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;
pub mod upload;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
