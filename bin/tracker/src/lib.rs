//! Swarm leaderboard tracker.
//!
//! Reconstructs the full ranking of training-network peers by merging the
//! coordinator contract's on-chain winner declarations with the gated
//! top-N snapshot exposed by the public ranking API.

pub mod api;
pub mod chain;
pub mod config;
pub mod driver;
pub mod leaderboard;
pub mod upstream;
