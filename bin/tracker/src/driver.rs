//! Optional interval-driven sync driver.
//!
//! The core never loops on its own: one `sync()` call covers a bounded
//! block range, and someone has to call again while `needs_more_sync`
//! holds. Deployments without an external scheduler can enable this
//! driver, which plays that role in-process on a fixed interval.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

use crate::chain::{ChainClient, ChainSynchronizer};
use crate::leaderboard::LeaderboardCache;

/// Where the driver is in its catch-up cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No run attempted yet
    Idle,
    /// A sync call is in flight
    Running,
    /// The last run finished with blocks still behind the head
    NeedsMore,
    /// The last run caught up to the chain head
    Done,
    /// The last run failed; the next tick retries
    Error,
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub interval_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { interval_secs: 15 }
    }
}

/// Ticks on a fixed interval and runs one bounded sync per tick.
pub struct SyncDriver<C: ChainClient> {
    synchronizer: Arc<ChainSynchronizer<C>>,
    cache: Arc<LeaderboardCache>,
    sync_lock: Arc<tokio::sync::Mutex<()>>,
    config: DriverConfig,
    state: RwLock<DriverState>,
    cancel_token: CancellationToken,
}

impl<C: ChainClient> SyncDriver<C> {
    pub fn new(
        synchronizer: Arc<ChainSynchronizer<C>>,
        cache: Arc<LeaderboardCache>,
        sync_lock: Arc<tokio::sync::Mutex<()>>,
        config: DriverConfig,
    ) -> Self {
        Self {
            synchronizer,
            cache,
            sync_lock,
            config,
            state: RwLock::new(DriverState::Idle),
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn state(&self) -> DriverState {
        *self.state.read()
    }

    /// Run the driver loop until cancelled.
    pub async fn run(self: Arc<Self>) -> eyre::Result<()> {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            "🚀 Starting sync driver"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.step().await;
                }
                _ = self.cancel_token.cancelled() => {
                    tracing::info!("Sync driver shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// One driver step: a single bounded sync run.
    pub async fn step(&self) {
        *self.state.write() = DriverState::Running;

        // Same serialization point as POST /sync, so an operator-triggered
        // run never races the driver on the cursor.
        let _guard = self.sync_lock.lock().await;

        match self.synchronizer.sync().await {
            Ok(outcome) => {
                if outcome.to_block > outcome.from_block {
                    self.cache.invalidate();
                }
                let next = if outcome.needs_more_sync {
                    DriverState::NeedsMore
                } else {
                    DriverState::Done
                };
                tracing::debug!(
                    to_block = outcome.to_block,
                    remaining = outcome.remaining_blocks,
                    state = ?next,
                    "Driver step finished"
                );
                *self.state.write() = next;
            }
            Err(e) => {
                tracing::warn!(%e, "Driver sync run failed, will retry on the next tick");
                *self.state.write() = DriverState::Error;
            }
        }
    }
}
