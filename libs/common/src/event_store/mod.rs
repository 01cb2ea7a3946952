//! Durable store for on-chain winner-declaration events.
//!
//! This module provides:
//! - Record types for winner events and per-contract sync cursors
//! - Idempotent insert-if-absent ingestion keyed by (tx_hash, peer_id)
//! - Persistence via an append-only JSON-lines journal replayed on open
//! - Thread-safe shared access for concurrent readers during a sync
//!
//! # Architecture
//!
//! Winner declarations are immutable once mined, so the log is append-only
//! and never invalidated; persistence follows the same shape, appending
//! one journal line per durable mutation instead of rewriting snapshots.
//! The sync cursor records the last fully-processed block per contract; it
//! is only ever advanced, never rewound, which is what makes interrupted
//! syncs resumable without gaps.

pub mod journal;
pub mod store;
pub mod types;

pub use journal::{
    Journal, JournalRecord, StoreConfig, StoreError, DEFAULT_STORE_PATH, STORE_PATH_ENV_VAR,
};
pub use store::{EventStore, InsertOutcome};
pub use types::{SyncCursor, WinnerEvent};
