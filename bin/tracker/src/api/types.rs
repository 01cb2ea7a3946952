//! Request and response types for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::SyncOutcome;
use crate::leaderboard::{LeaderboardEntry, LeaderboardStats};

/// Query parameters for `GET /leaderboard`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// Page size; omitted or oversized means "all"
    pub limit: Option<usize>,
    /// Zero-based offset into the ranked sequence
    pub offset: Option<usize>,
}

/// Response body for `GET /leaderboard`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    /// Size of the full ranked sequence, independent of the page
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub built_at: DateTime<Utc>,
    /// Set when an upstream outage forced serving an expired generation
    pub stale: bool,
    pub stats: LeaderboardStats,
}

/// Response body for `POST /sync`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub from_block: u64,
    pub to_block: u64,
    pub current_block: u64,
    pub processed_events: usize,
    pub remaining_blocks: u64,
    /// Share of the chain range synced so far, 0..=100
    pub progress: f64,
    pub needs_more_sync: bool,
    pub batch_errors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResponse {
    pub fn from_outcome(outcome: &SyncOutcome) -> Self {
        Self {
            success: true,
            from_block: outcome.from_block,
            to_block: outcome.to_block,
            current_block: outcome.chain_head,
            processed_events: outcome.processed_events,
            remaining_blocks: outcome.remaining_blocks,
            progress: outcome.progress_percent,
            needs_more_sync: outcome.needs_more_sync,
            batch_errors: outcome.batch_errors,
            error: None,
        }
    }

    /// A failed run: no progress, with the block the run would have
    /// resumed from for context
    pub fn failure(from_block: u64, message: String) -> Self {
        Self {
            success: false,
            from_block,
            to_block: from_block,
            current_block: 0,
            processed_events: 0,
            remaining_blocks: 0,
            progress: 0.0,
            needs_more_sync: true,
            batch_errors: 0,
            error: Some(message),
        }
    }
}

/// Generic error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub stored_events: usize,
    pub tracked_peers: usize,
    pub timestamp: String,
}
