//! The aggregator: single entry point for building the merged leaderboard.

use std::sync::Arc;

use chrono::Utc;
use common::event_store::EventStore;

use super::cache::{CachedLeaderboard, LeaderboardCache, LeaderboardStats};
use super::merge::merge_sources;
use super::rank::rank;
use crate::upstream::UpstreamSource;

/// Errors surfaced by a leaderboard build
#[derive(Debug)]
pub enum AggregateError {
    /// The ranking API was unreachable and no previous generation exists
    /// to degrade to
    UpstreamUnavailable { reason: String },
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateError::UpstreamUnavailable { reason } => {
                write!(f, "Ranking API unavailable: {}", reason)
            }
        }
    }
}

impl std::error::Error for AggregateError {}

/// A built (or cache-served) leaderboard
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub leaderboard: CachedLeaderboard,
    /// Served from the fresh cache without touching the upstream
    pub from_cache: bool,
    /// Served from an expired generation because the upstream was down
    pub stale: bool,
}

/// Merges the ranking API snapshot with the event store into one ranked
/// leaderboard, behind the TTL cache.
///
/// The event store is read-only in this path; the only side effect is
/// repopulating the cache.
pub struct Aggregator<U: UpstreamSource> {
    upstream: U,
    store: Arc<EventStore>,
    cache: Arc<LeaderboardCache>,
}

impl<U: UpstreamSource> Aggregator<U> {
    pub fn new(upstream: U, store: Arc<EventStore>, cache: Arc<LeaderboardCache>) -> Self {
        Self {
            upstream,
            store,
            cache,
        }
    }

    /// Build the leaderboard, or serve it from the cache.
    pub async fn build_leaderboard(&self) -> Result<AggregateResult, AggregateError> {
        if let Some(cached) = self.cache.fresh() {
            return Ok(AggregateResult {
                leaderboard: cached,
                from_cache: true,
                stale: false,
            });
        }

        let (snapshot_result, counters) =
            tokio::join!(self.upstream.leaderboard(), self.upstream.counters());

        let snapshot = match snapshot_result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Availability over freshness: an expired generation beats
                // a failed request.
                if let Some(previous) = self.cache.any() {
                    tracing::warn!(?e, "Ranking API unreachable, serving stale leaderboard");
                    return Ok(AggregateResult {
                        leaderboard: previous,
                        from_cache: true,
                        stale: true,
                    });
                }
                return Err(AggregateError::UpstreamUnavailable {
                    reason: e.to_string(),
                });
            }
        };

        let events = self.store.events_by_block();
        let merged = merge_sources(&snapshot.peers, &events);
        let entries = rank(merged);

        let stats = LeaderboardStats {
            total_peers: entries.len(),
            api_peers: snapshot.peers.len(),
            chain_events: events.len(),
            total_chain_reward: events.iter().map(|e| e.reward).sum(),
            counters,
        };

        tracing::info!(
            total_peers = stats.total_peers,
            api_peers = stats.api_peers,
            chain_events = stats.chain_events,
            "Rebuilt leaderboard"
        );

        let built = CachedLeaderboard {
            entries: Arc::new(entries),
            stats,
            updated_at: snapshot.updated_at,
            built_at: Utc::now(),
        };
        self.cache.put(built.clone());

        Ok(AggregateResult {
            leaderboard: built,
            from_cache: false,
            stale: false,
        })
    }
}
