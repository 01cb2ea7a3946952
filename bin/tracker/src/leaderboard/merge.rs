//! Merging the API snapshot and the event store into per-peer metrics.

use std::collections::HashMap;

use common::event_store::WinnerEvent;
use serde::{Deserialize, Serialize};

use crate::upstream::ApiPeerSnapshot;

/// Which data source(s) contributed to a peer's merged metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    ApiOnly,
    ChainOnly,
    Both,
}

/// Per-peer aggregate used to build the leaderboard.
///
/// Rebuilt from scratch on every cache-miss merge pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMetric {
    pub peer_id: String,
    pub participations: u64,
    pub wins: u64,
    pub provenance: Provenance,
}

/// Merge the API snapshot with the full event log.
///
/// The API snapshot seeds the baseline; every stored chain event then adds
/// one participation and one win on top. The map strictly accumulates: no
/// peer is ever removed, and the result is independent of which source was
/// fetched first.
pub fn merge_sources(
    api_peers: &[ApiPeerSnapshot],
    events: &[WinnerEvent],
) -> HashMap<String, PeerMetric> {
    let mut metrics: HashMap<String, PeerMetric> = HashMap::with_capacity(api_peers.len());

    for peer in api_peers {
        metrics.insert(
            peer.peer_id.clone(),
            PeerMetric {
                peer_id: peer.peer_id.clone(),
                participations: peer.participations,
                wins: peer.wins,
                provenance: Provenance::ApiOnly,
            },
        );
    }

    for event in events {
        match metrics.get_mut(&event.peer_id) {
            Some(metric) => {
                metric.participations += 1;
                metric.wins += 1;
                metric.provenance = match metric.provenance {
                    Provenance::ChainOnly => Provenance::ChainOnly,
                    _ => Provenance::Both,
                };
            }
            None => {
                metrics.insert(
                    event.peer_id.clone(),
                    PeerMetric {
                        peer_id: event.peer_id.clone(),
                        participations: 1,
                        wins: 1,
                        provenance: Provenance::ChainOnly,
                    },
                );
            }
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn api_peer(id: &str, participations: u64, wins: u64) -> ApiPeerSnapshot {
        ApiPeerSnapshot {
            peer_id: id.into(),
            participations,
            wins,
        }
    }

    fn chain_event(id: &str, block: u64, tx: &str) -> WinnerEvent {
        WinnerEvent {
            peer_id: id.into(),
            block_number: block,
            tx_hash: tx.into(),
            round: None,
            reward: 1,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn combines_api_baseline_with_chain_increments() {
        let api = vec![api_peer("A", 5, 5)];
        let events = vec![
            chain_event("A", 10, "0x1"),
            chain_event("A", 11, "0x2"),
            chain_event("B", 12, "0x3"),
        ];

        let merged = merge_sources(&api, &events);
        assert_eq!(merged.len(), 2);

        let a = &merged["A"];
        assert_eq!(a.participations, 7);
        assert_eq!(a.wins, 7);
        assert_eq!(a.provenance, Provenance::Both);

        let b = &merged["B"];
        assert_eq!(b.participations, 1);
        assert_eq!(b.wins, 1);
        assert_eq!(b.provenance, Provenance::ChainOnly);
    }

    #[test]
    fn api_only_peers_keep_their_provenance() {
        let merged = merge_sources(&[api_peer("A", 3, 2)], &[]);
        assert_eq!(merged["A"].provenance, Provenance::ApiOnly);
        assert_eq!(merged["A"].participations, 3);
        assert_eq!(merged["A"].wins, 2);
    }

    #[test]
    fn repeated_chain_only_events_stay_chain_only() {
        let events = vec![chain_event("B", 1, "0x1"), chain_event("B", 2, "0x2")];
        let merged = merge_sources(&[], &events);
        assert_eq!(merged["B"].participations, 2);
        assert_eq!(merged["B"].provenance, Provenance::ChainOnly);
    }

    #[test]
    fn merge_never_removes_entries() {
        let api = vec![api_peer("A", 1, 1), api_peer("B", 2, 2)];
        let events = vec![chain_event("C", 1, "0x1")];
        let merged = merge_sources(&api, &events);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn provenance_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Provenance::ApiOnly).unwrap(),
            "\"api-only\""
        );
        assert_eq!(
            serde_json::to_string(&Provenance::ChainOnly).unwrap(),
            "\"chain-only\""
        );
        assert_eq!(serde_json::to_string(&Provenance::Both).unwrap(), "\"both\"");
    }
}
