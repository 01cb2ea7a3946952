//! Deterministic ranking of merged peer metrics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::merge::PeerMetric;

/// One externally visible leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Dense 1-based rank, assigned by position in the sorted sequence
    pub rank: u64,
    pub peer_id: String,
    pub participations: u64,
    pub wins: u64,
}

/// Sort merged metrics into the ranked sequence.
///
/// Total order: participations descending, wins descending, peer id
/// ascending. The final lexicographic tie-break makes the order fully
/// deterministic, which pagination correctness depends on: no entry may
/// appear on two pages, or on none, across repeated identical queries.
pub fn rank(metrics: HashMap<String, PeerMetric>) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<PeerMetric> = metrics.into_values().collect();
    sorted.sort_by(|a, b| {
        b.participations
            .cmp(&a.participations)
            .then_with(|| b.wins.cmp(&a.wins))
            .then_with(|| a.peer_id.cmp(&b.peer_id))
    });

    sorted
        .into_iter()
        .enumerate()
        .map(|(i, m)| LeaderboardEntry {
            rank: i as u64 + 1,
            peer_id: m.peer_id,
            participations: m.participations,
            wins: m.wins,
        })
        .collect()
}
