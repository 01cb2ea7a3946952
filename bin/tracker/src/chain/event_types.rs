//! Event types for the swarm coordinator contract
//!
//! The coordinator emits one `WinnersDeclared` log per settled training
//! round. Winners and rewards are index-aligned arrays: winner `i` was
//! credited reward `i`.

use alloy_primitives::{Address, Bytes, Log as PrimitiveLog, B256};
use alloy_sol_types::{sol, SolEvent};
use chrono::{DateTime, Utc};
use common::event_store::WinnerEvent;

use super::errors::ChainError;

sol! {
    /// Emitted by the coordinator when a round's winners are settled
    #[derive(Debug)]
    event WinnersDeclared(
        uint256 round,
        string[] winners,
        uint256[] rewards
    );
}

/// A raw log record as returned by the RPC endpoint, before decoding.
///
/// Kept as plain primitives so tests can fabricate logs without a provider.
#[derive(Debug, Clone)]
pub struct RawWinnerLog {
    /// Emitting contract address
    pub address: Address,
    /// Log topics; topic0 is the event signature
    pub topics: Vec<B256>,
    /// ABI-encoded event body
    pub data: Bytes,
    /// Block the log was mined in
    pub block_number: Option<u64>,
    /// Transaction hash, when the provider reports one
    pub tx_hash: Option<B256>,
    /// Block timestamp in epoch seconds, when the provider reports one
    pub block_timestamp: Option<u64>,
}

/// A decoded `WinnersDeclared` log with its chain context
#[derive(Debug, Clone)]
pub struct WinnerDeclaration {
    /// Training round, when it fits a u64
    pub round: Option<u64>,
    /// Winning peer identifiers
    pub winners: Vec<String>,
    /// Rewards index-aligned with `winners`; missing slots read as zero
    pub rewards: Vec<u128>,
    /// Block number of the declaration
    pub block_number: u64,
    /// Transaction hash of the declaration
    pub tx_hash: String,
    /// Block timestamp, or the moment we observed the log
    pub observed_at: DateTime<Utc>,
}

impl WinnerDeclaration {
    /// Expand the declaration into one store row per winner
    pub fn into_events(self) -> Vec<WinnerEvent> {
        let rewards = self.rewards;
        self.winners
            .into_iter()
            .enumerate()
            .map(|(i, peer_id)| WinnerEvent {
                peer_id,
                block_number: self.block_number,
                tx_hash: self.tx_hash.clone(),
                round: self.round,
                reward: rewards.get(i).copied().unwrap_or(0),
                observed_at: self.observed_at,
            })
            .collect()
    }
}

/// Decode a raw log into a [`WinnerDeclaration`].
///
/// A log that is not a `WinnersDeclared` event, lacks a transaction hash,
/// or carries an undecodable body is a [`ChainError::DecodeError`].
pub fn decode_winner_log(raw: &RawWinnerLog) -> Result<WinnerDeclaration, ChainError> {
    let topic0 = raw.topics.first().ok_or(ChainError::DecodeError {
        reason: "log has no topics".to_string(),
    })?;

    if *topic0 != WinnersDeclared::SIGNATURE_HASH {
        return Err(ChainError::DecodeError {
            reason: format!("unexpected event signature: {}", topic0),
        });
    }

    let tx_hash = raw.tx_hash.ok_or(ChainError::DecodeError {
        reason: "log has no transaction hash".to_string(),
    })?;

    let log = PrimitiveLog::new(raw.address, raw.topics.clone(), raw.data.clone()).ok_or(
        ChainError::DecodeError {
            reason: "malformed log topics".to_string(),
        },
    )?;

    let decoded = WinnersDeclared::decode_log(&log).map_err(|e| ChainError::DecodeError {
        reason: e.to_string(),
    })?;

    let observed_at = raw
        .block_timestamp
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
        .unwrap_or_else(Utc::now);

    Ok(WinnerDeclaration {
        round: u64::try_from(decoded.data.round).ok(),
        winners: decoded.data.winners.clone(),
        rewards: decoded
            .data
            .rewards
            .iter()
            .map(|r| u128::try_from(*r).unwrap_or(u128::MAX))
            .collect(),
        block_number: raw.block_number.unwrap_or(0),
        tx_hash: format!("{:#x}", tx_hash),
        observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn raw_log(round: u64, winners: Vec<&str>, rewards: Vec<u64>, block: u64) -> RawWinnerLog {
        let event = WinnersDeclared {
            round: U256::from(round),
            winners: winners.into_iter().map(String::from).collect(),
            rewards: rewards.into_iter().map(U256::from).collect(),
        };
        let log_data = event.encode_log_data();
        RawWinnerLog {
            address: Address::repeat_byte(0x42),
            topics: log_data.topics().to_vec(),
            data: log_data.data.clone(),
            block_number: Some(block),
            tx_hash: Some(B256::repeat_byte(0x07)),
            block_timestamp: Some(1_700_000_000),
        }
    }

    #[test]
    fn decodes_winners_declared_log() {
        let raw = raw_log(12, vec!["peer-a", "peer-b"], vec![5, 9], 1042);
        let decl = decode_winner_log(&raw).unwrap();

        assert_eq!(decl.round, Some(12));
        assert_eq!(decl.winners, vec!["peer-a", "peer-b"]);
        assert_eq!(decl.rewards, vec![5, 9]);
        assert_eq!(decl.block_number, 1042);
        assert!(decl.tx_hash.starts_with("0x"));
    }

    #[test]
    fn into_events_zips_rewards_and_pads_missing_slots() {
        let raw = raw_log(1, vec!["peer-a", "peer-b"], vec![5], 10);
        let events = decode_winner_log(&raw).unwrap().into_events();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].peer_id, "peer-a");
        assert_eq!(events[0].reward, 5);
        assert_eq!(events[1].peer_id, "peer-b");
        assert_eq!(events[1].reward, 0);
        assert_eq!(events[0].tx_hash, events[1].tx_hash);
    }

    #[test]
    fn rejects_unknown_signature() {
        let mut raw = raw_log(1, vec!["peer-a"], vec![1], 10);
        raw.topics[0] = B256::repeat_byte(0xff);
        assert!(matches!(
            decode_winner_log(&raw),
            Err(ChainError::DecodeError { .. })
        ));
    }

    #[test]
    fn rejects_log_without_tx_hash() {
        let mut raw = raw_log(1, vec!["peer-a"], vec![1], 10);
        raw.tx_hash = None;
        assert!(matches!(
            decode_winner_log(&raw),
            Err(ChainError::DecodeError { .. })
        ));
    }

    #[test]
    fn rejects_garbage_body() {
        let mut raw = raw_log(1, vec!["peer-a"], vec![1], 10);
        raw.data = Bytes::from(vec![0xde, 0xad]);
        assert!(matches!(
            decode_winner_log(&raw),
            Err(ChainError::DecodeError { .. })
        ));
    }
}
