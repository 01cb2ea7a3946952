//! Record types for the winner-event store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One winner credited by one on-chain `WinnersDeclared` transaction.
///
/// A single transaction may credit several distinct peers, so `tx_hash`
/// alone is not unique; the pair `(tx_hash, peer_id)` is. Rows are
/// append-only: once written they are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinnerEvent {
    /// Opaque peer identifier as emitted by the coordinator contract
    pub peer_id: String,
    /// Block the declaration was mined in
    pub block_number: u64,
    /// Transaction hash of the declaration
    pub tx_hash: String,
    /// Training round, when the contract reported one
    pub round: Option<u64>,
    /// Reward value credited alongside the win
    pub reward: u128,
    /// When the synchronizer first observed this row
    pub observed_at: DateTime<Utc>,
}

impl WinnerEvent {
    /// Uniqueness key for idempotent ingestion
    pub fn key(&self) -> (String, String) {
        (self.tx_hash.clone(), self.peer_id.clone())
    }
}

/// Persisted watermark of the last fully-processed block for a contract.
///
/// `last_synced_block` is an exclusive lower bound for the next sync run:
/// all events below it have been durably written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncCursor {
    /// Lowercase-normalized contract address (identity key)
    pub contract_address: String,
    /// Highest block height for which all events are persisted
    pub last_synced_block: u64,
    /// When the cursor was last advanced
    pub last_sync_at: DateTime<Utc>,
}

/// Normalize a contract address for use as a cursor key.
pub(crate) fn normalize_contract(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}
