//! Leaderboard core: merge, ranking, caching, and the aggregator
//!
//! This module provides:
//! - The per-peer metric merge across the API snapshot and the event store
//! - Deterministic ranking with a total order over peers
//! - The process-wide TTL result cache
//! - The aggregator tying the pieces together behind one entry point

mod aggregator;
mod cache;
mod merge;
mod rank;

pub use aggregator::{AggregateError, AggregateResult, Aggregator};
pub use cache::{CachedLeaderboard, LeaderboardCache, LeaderboardStats};
pub use merge::{merge_sources, PeerMetric, Provenance};
pub use rank::{rank, LeaderboardEntry};
