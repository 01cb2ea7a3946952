//! HTTP API module
//!
//! This module provides:
//! - Request/response types for the leaderboard and sync endpoints
//! - axum handlers over the shared application state
//! - Router assembly and the CORS-open serving loop with graceful shutdown

mod routes;
mod server;
mod types;

pub use routes::{get_leaderboard, health, post_sync, AppState};
pub use server::{router, HttpApi, ServeError};
pub use types::{
    ErrorResponse, HealthResponse, LeaderboardQuery, LeaderboardResponse, SyncResponse,
};
