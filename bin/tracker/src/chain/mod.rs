//! Chain connectivity module for winner-declaration syncing
//!
//! This module provides:
//! - Event types and ABI decoding for `WinnersDeclared` logs
//! - A chain client seam over the RPC endpoint (head + log queries)
//! - The bounded, resumable synchronizer that feeds the event store

mod client;
mod errors;
mod event_types;
mod synchronizer;

pub use client::{ChainClient, RpcChainClient};
pub use errors::ChainError;
pub use event_types::{decode_winner_log, RawWinnerLog, WinnerDeclaration, WinnersDeclared};
pub use synchronizer::{ChainSynchronizer, SyncConfig, SyncOutcome};
