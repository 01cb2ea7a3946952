//! Process-wide result cache for the built leaderboard.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::rank::LeaderboardEntry;
use crate::upstream::NetworkCounters;

/// Display-only statistics attached to a built leaderboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardStats {
    /// Distinct peers in the merged result
    pub total_peers: usize,
    /// Peers reported by the API snapshot
    pub api_peers: usize,
    /// Winner events read from the store
    pub chain_events: usize,
    /// Sum of the reward values credited across all stored winner events
    pub total_chain_reward: u128,
    #[serde(flatten)]
    pub counters: NetworkCounters,
}

/// One fully built leaderboard generation
#[derive(Debug, Clone)]
pub struct CachedLeaderboard {
    /// Full ranked sequence; shared so pages are served without copying it
    pub entries: Arc<Vec<LeaderboardEntry>>,
    pub stats: LeaderboardStats,
    /// Upstream snapshot timestamp, when the API reported one
    pub updated_at: Option<DateTime<Utc>>,
    pub built_at: DateTime<Utc>,
}

/// Holds at most one leaderboard generation with a fixed TTL.
///
/// This is the system's only throttle on rebuild frequency: requests
/// inside the freshness window are served the cached generation
/// unchanged. There is exactly one leaderboard, so one slot.
pub struct LeaderboardCache {
    slot: RwLock<Option<CachedLeaderboard>>,
    ttl_secs: i64,
}

impl LeaderboardCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl_secs,
        }
    }

    /// The cached generation, if it is still inside the TTL window
    pub fn fresh(&self) -> Option<CachedLeaderboard> {
        self.slot.read().as_ref().and_then(|cached| {
            let age = Utc::now().signed_duration_since(cached.built_at);
            if age.num_seconds() < self.ttl_secs {
                tracing::debug!(age_secs = age.num_seconds(), "Leaderboard cache hit");
                Some(cached.clone())
            } else {
                tracing::debug!(age_secs = age.num_seconds(), "Leaderboard cache expired");
                None
            }
        })
    }

    /// The cached generation regardless of age. Used to degrade to
    /// stale-but-available data when the upstream API is down.
    pub fn any(&self) -> Option<CachedLeaderboard> {
        self.slot.read().clone()
    }

    /// Replace the cached generation wholesale
    pub fn put(&self, cached: CachedLeaderboard) {
        *self.slot.write() = Some(cached);
    }

    /// Drop the cached generation so the next request rebuilds.
    /// Triggered by a completed sync cycle that made progress.
    pub fn invalidate(&self) {
        *self.slot.write() = None;
        tracing::debug!("Leaderboard cache invalidated");
    }
}
