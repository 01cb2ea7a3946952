//! Shared handle over the winner-event log with idempotent ingestion.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use super::journal::{Journal, JournalRecord, StoreConfig, StoreError};
use super::types::{normalize_contract, SyncCursor, WinnerEvent};

/// Result of a batch insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Rows actually appended
    pub inserted: usize,
    /// Rows skipped because their (tx_hash, peer_id) key was already present
    pub duplicates: usize,
}

struct StoreState {
    events: Vec<WinnerEvent>,
    cursors: HashMap<String, SyncCursor>,
    /// (tx_hash, peer_id) keys of every stored event
    seen: HashSet<(String, String)>,
}

impl StoreState {
    fn empty() -> Self {
        Self {
            events: Vec::new(),
            cursors: HashMap::new(),
            seen: HashSet::new(),
        }
    }
}

/// Thread-safe store over the winner-event log and sync cursors.
///
/// All mutations go through idempotent upserts keyed by natural uniqueness
/// constraints, so retried or duplicate calls are safe without extra
/// locking. Every mutation is appended to the journal before it becomes
/// visible in memory, so a row a reader can see is always durable.
pub struct EventStore {
    journal: Option<Mutex<Journal>>,
    state: RwLock<StoreState>,
}

impl EventStore {
    /// Open the store, replaying the journal into memory.
    ///
    /// Replay applies the same idempotence rules as live ingestion, so a
    /// journal that recorded a re-scan of an already-written range loads
    /// without duplicate rows.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let (journal, records) = Journal::open(Path::new(&config.path))?;

        let mut state = StoreState::empty();
        for record in records {
            match record {
                JournalRecord::Winner(event) => {
                    if state.seen.insert(event.key()) {
                        state.events.push(event);
                    }
                }
                JournalRecord::Cursor(cursor) => {
                    let advanced = state
                        .cursors
                        .get(&cursor.contract_address)
                        .map_or(true, |existing| {
                            existing.last_synced_block < cursor.last_synced_block
                        });
                    if advanced {
                        state.cursors.insert(cursor.contract_address.clone(), cursor);
                    }
                }
            }
        }

        tracing::debug!(
            events = state.events.len(),
            cursors = state.cursors.len(),
            "Replayed event journal"
        );

        Ok(Self {
            journal: Some(Mutex::new(journal)),
            state: RwLock::new(state),
        })
    }

    /// An in-memory store that never touches disk. Used by tests and by
    /// callers that manage persistence elsewhere.
    pub fn ephemeral() -> Self {
        Self {
            journal: None,
            state: RwLock::new(StoreState::empty()),
        }
    }

    /// Insert a batch of winner events, skipping rows whose
    /// (tx_hash, peer_id) key is already stored. Re-ingesting the same
    /// transaction is a no-op, not an error.
    pub fn insert_events(&self, events: Vec<WinnerEvent>) -> Result<InsertOutcome, StoreError> {
        let mut state = self.state.write();
        let mut outcome = InsertOutcome::default();

        let mut fresh = Vec::new();
        let mut batch_keys = HashSet::new();
        for event in events {
            let key = event.key();
            if state.seen.contains(&key) || !batch_keys.insert(key) {
                outcome.duplicates += 1;
                continue;
            }
            fresh.push(event);
        }

        if !fresh.is_empty() {
            let rows: Vec<JournalRecord> =
                fresh.iter().cloned().map(JournalRecord::Winner).collect();
            self.append(&rows)?;

            outcome.inserted = fresh.len();
            for event in fresh {
                state.seen.insert(event.key());
                state.events.push(event);
            }
        }
        Ok(outcome)
    }

    /// Full event log ordered by block number ascending, with a stable
    /// (tx_hash, peer_id) secondary order so repeated reads are identical.
    pub fn events_by_block(&self) -> Vec<WinnerEvent> {
        let state = self.state.read();
        let mut events = state.events.clone();
        events.sort_by(|a, b| {
            a.block_number
                .cmp(&b.block_number)
                .then_with(|| a.tx_hash.cmp(&b.tx_hash))
                .then_with(|| a.peer_id.cmp(&b.peer_id))
        });
        events
    }

    /// Sync cursor for a contract, if one has been written
    pub fn cursor(&self, contract_address: &str) -> Option<SyncCursor> {
        let key = normalize_contract(contract_address);
        self.state.read().cursors.get(&key).cloned()
    }

    /// Advance the cursor for a contract to `block`.
    ///
    /// The cursor is monotonic: an attempt to move it backwards keeps the
    /// existing value (and writes nothing to the journal).
    pub fn advance_cursor(
        &self,
        contract_address: &str,
        block: u64,
    ) -> Result<SyncCursor, StoreError> {
        let key = normalize_contract(contract_address);
        let mut state = self.state.write();

        if let Some(existing) = state.cursors.get(&key) {
            if existing.last_synced_block >= block {
                return Ok(existing.clone());
            }
        }

        let cursor = SyncCursor {
            contract_address: key.clone(),
            last_synced_block: block,
            last_sync_at: Utc::now(),
        };
        self.append(&[JournalRecord::Cursor(cursor.clone())])?;
        state.cursors.insert(key, cursor.clone());
        Ok(cursor)
    }

    /// Number of stored winner events
    pub fn event_count(&self) -> usize {
        self.state.read().events.len()
    }

    /// Number of distinct peers appearing in the log
    pub fn distinct_peer_count(&self) -> usize {
        let state = self.state.read();
        let mut peers: Vec<&str> = state.events.iter().map(|e| e.peer_id.as_str()).collect();
        peers.sort_unstable();
        peers.dedup();
        peers.len()
    }

    fn append(&self, records: &[JournalRecord]) -> Result<(), StoreError> {
        match &self.journal {
            Some(journal) => journal.lock().append_all(records),
            None => Ok(()),
        }
    }
}
