//! Shared library for the swarm leaderboard tracker.
//!
//! Holds the durable event store: the append-only log of on-chain winner
//! declarations and the per-contract sync cursors, persisted as an
//! append-only journal replayed at startup.

pub mod event_store;
