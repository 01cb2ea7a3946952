//! Snapshot types and tolerant field parsing for the ranking API.
//!
//! The upstream API has shipped several shapes for the same logical
//! fields. Each attribute has an explicit ordered list of accepted names;
//! the first present, non-null variant wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accepted field names for the peer identifier, in priority order
pub const PEER_ID_FIELDS: &[&str] = &["peerId", "peer_id", "id"];

/// Accepted field names for the participation count, in priority order
pub const PARTICIPATION_FIELDS: &[&str] = &["participation", "score"];

/// Accepted field names for the reward score, in priority order
pub const REWARD_FIELDS: &[&str] = &["trainingRewards", "reward"];

/// One peer as reported by the ranking API, after field resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiPeerSnapshot {
    pub peer_id: String,
    pub participations: u64,
    pub wins: u64,
}

/// The ranking API's current top-N snapshot
#[derive(Debug, Clone, Default)]
pub struct ApiLeaderboard {
    pub peers: Vec<ApiPeerSnapshot>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Display-only network counters from the auxiliary endpoints.
///
/// Each counter is best-effort: an unreachable endpoint leaves it `None`
/// and never fails a leaderboard build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCounters {
    pub network_peers: Option<u64>,
    pub nodes_connected: Option<u64>,
    pub unique_voters: Option<u64>,
}

/// First present, non-null value among `names`
fn pick<'a>(entry: &'a Value, names: &[&str]) -> Option<&'a Value> {
    let obj = entry.as_object()?;
    names
        .iter()
        .find_map(|name| obj.get(*name).filter(|v| !v.is_null()))
}

fn pick_string(entry: &Value, names: &[&str]) -> Option<String> {
    pick(entry, names)?.as_str().map(str::to_string)
}

/// Resolve a numeric field, tolerating integers, floats, and numeric
/// strings.
pub(crate) fn pick_u64(entry: &Value, names: &[&str]) -> Option<u64> {
    match pick(entry, names)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_updated_at(value: &Value) -> Option<DateTime<Utc>> {
    match pick(value, &["updatedAt", "updated_at"])? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

/// Parse the `/leaderboard` response body.
///
/// Entries missing every peer-id variant are dropped. When no reward
/// variant is present, the wins baseline falls back to the participation
/// count so chain increments stay comparable across peers.
pub fn parse_leaderboard(body: &Value) -> ApiLeaderboard {
    let entries = body
        .get("entries")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut peers = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(peer_id) = pick_string(entry, PEER_ID_FIELDS) else {
            tracing::warn!(?entry, "Leaderboard entry without a peer id, skipping");
            continue;
        };
        let participations = pick_u64(entry, PARTICIPATION_FIELDS).unwrap_or(0);
        let wins = pick_u64(entry, REWARD_FIELDS).unwrap_or(participations);
        peers.push(ApiPeerSnapshot {
            peer_id,
            participations,
            wins,
        });
    }

    ApiLeaderboard {
        peers,
        updated_at: parse_updated_at(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_primary_field_names() {
        let body = json!({
            "entries": [
                {"peerId": "peer-a", "participation": 5, "trainingRewards": 3}
            ],
            "updatedAt": "2026-01-15T10:00:00Z"
        });

        let parsed = parse_leaderboard(&body);
        assert_eq!(parsed.peers.len(), 1);
        assert_eq!(
            parsed.peers[0],
            ApiPeerSnapshot {
                peer_id: "peer-a".into(),
                participations: 5,
                wins: 3
            }
        );
        assert!(parsed.updated_at.is_some());
    }

    #[test]
    fn falls_back_through_field_variants_in_order() {
        let body = json!({
            "entries": [
                {"peer_id": "peer-a", "score": 7, "reward": 2},
                {"id": "peer-b", "score": 4}
            ]
        });

        let parsed = parse_leaderboard(&body);
        assert_eq!(parsed.peers[0].participations, 7);
        assert_eq!(parsed.peers[0].wins, 2);
        assert_eq!(parsed.peers[1].peer_id, "peer-b");
    }

    #[test]
    fn null_variant_yields_to_the_next_name() {
        let body = json!({
            "entries": [
                {"peerId": null, "peer_id": "peer-a", "participation": null, "score": 9}
            ]
        });

        let parsed = parse_leaderboard(&body);
        assert_eq!(parsed.peers[0].peer_id, "peer-a");
        assert_eq!(parsed.peers[0].participations, 9);
    }

    #[test]
    fn first_present_variant_is_authoritative() {
        // "participation" wins over "score" even when both are present
        let body = json!({
            "entries": [
                {"peerId": "peer-a", "participation": 5, "score": 99}
            ]
        });
        assert_eq!(parse_leaderboard(&body).peers[0].participations, 5);
    }

    #[test]
    fn wins_default_to_the_participation_baseline() {
        let body = json!({
            "entries": [{"peerId": "peer-a", "participation": 5}]
        });
        assert_eq!(parse_leaderboard(&body).peers[0].wins, 5);
    }

    #[test]
    fn entries_without_any_id_variant_are_dropped() {
        let body = json!({
            "entries": [
                {"participation": 5},
                {"peerId": "peer-b", "participation": 1}
            ]
        });
        let parsed = parse_leaderboard(&body);
        assert_eq!(parsed.peers.len(), 1);
        assert_eq!(parsed.peers[0].peer_id, "peer-b");
    }

    #[test]
    fn tolerates_float_and_string_numbers() {
        let body = json!({
            "entries": [
                {"peerId": "peer-a", "participation": 5.0},
                {"peerId": "peer-b", "participation": "12"}
            ]
        });
        let parsed = parse_leaderboard(&body);
        assert_eq!(parsed.peers[0].participations, 5);
        assert_eq!(parsed.peers[1].participations, 12);
    }

    #[test]
    fn epoch_updated_at_is_accepted() {
        let body = json!({"entries": [], "updated_at": 1_700_000_000});
        assert!(parse_leaderboard(&body).updated_at.is_some());
    }
}
