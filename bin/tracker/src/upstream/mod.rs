//! Upstream ranking API module
//!
//! This module provides:
//! - Tolerant parsing of the ranking API's leaderboard snapshot
//! - A reqwest client with per-request timeouts and bounded retries
//! - Best-effort fetching of the display-only network counters

mod client;
mod types;

pub use client::{RankingApiClient, UpstreamSource};
pub use types::{
    parse_leaderboard, ApiLeaderboard, ApiPeerSnapshot, NetworkCounters, PARTICIPATION_FIELDS,
    PEER_ID_FIELDS, REWARD_FIELDS,
};
