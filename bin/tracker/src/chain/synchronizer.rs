//! Incremental, resumable sync of winner declarations into the event store.

use std::cmp::min;
use std::sync::Arc;

use common::event_store::EventStore;

use super::client::ChainClient;
use super::errors::ChainError;
use super::event_types::decode_winner_log;

/// Configuration for the chain synchronizer
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Coordinator contract address (cursor identity key)
    pub contract_address: String,
    /// Block to start from when no cursor exists yet. Set to the
    /// contract's deployment height; scanning from genesis is wasted work.
    pub deploy_block: u64,
    /// Upper bound on blocks covered by a single `sync()` call. Long
    /// backfills are chunked across repeated calls instead of one
    /// unbounded run.
    pub max_blocks_per_run: u64,
    /// Blocks per `getLogs` call, matching the RPC provider's range limit
    pub batch_size: u64,
    /// Stop the run early once cumulative batch errors exceed this
    pub max_batch_errors: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            deploy_block: 0,
            max_blocks_per_run: 10_000,
            batch_size: 500,
            max_batch_errors: 5,
        }
    }
}

/// Result of one bounded sync run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// First block of the attempted range (the resumed cursor position)
    pub from_block: u64,
    /// Exclusive end of the fully-processed range; the new cursor value
    pub to_block: u64,
    /// Chain head observed at the start of the run
    pub chain_head: u64,
    /// Winner rows decoded in this run (inserted or already present)
    pub processed_events: usize,
    /// Decode and store failures tolerated during the run
    pub batch_errors: u32,
    /// Blocks still unsynced behind the head
    pub remaining_blocks: u64,
    /// Share of the range from the deploy block to the head that is synced
    pub progress_percent: f64,
    /// Whether the caller should invoke `sync()` again to catch up
    pub needs_more_sync: bool,
}

/// Pulls `WinnersDeclared` logs in bounded batches, writes them to the
/// event store, and advances the sync cursor.
///
/// One call covers at most `max_blocks_per_run` blocks; callers loop on
/// `needs_more_sync` to finish a backfill. Per-log decode failures and
/// per-row store failures are counted, not fatal; RPC connectivity
/// failures abort the call with the cursor untouched.
pub struct ChainSynchronizer<C: ChainClient> {
    client: C,
    store: Arc<EventStore>,
    config: SyncConfig,
}

impl<C: ChainClient> ChainSynchronizer<C> {
    pub fn new(client: C, store: Arc<EventStore>, config: SyncConfig) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    pub fn contract_address(&self) -> &str {
        &self.config.contract_address
    }

    /// Run one bounded sync cycle.
    pub async fn sync(&self) -> Result<SyncOutcome, ChainError> {
        let contract = &self.config.contract_address;

        let from_block = self
            .store
            .cursor(contract)
            .map(|c| c.last_synced_block)
            .unwrap_or(self.config.deploy_block);

        let chain_head = self.client.block_number().await?;

        if from_block >= chain_head {
            tracing::debug!(from_block, chain_head, "Already at chain head");
            return Ok(self.outcome(from_block, from_block, chain_head, 0, 0));
        }

        let target = min(
            from_block.saturating_add(self.config.max_blocks_per_run),
            chain_head,
        );

        tracing::info!(
            contract = %contract,
            from_block,
            target,
            chain_head,
            "Starting sync run"
        );

        let mut last_processed = from_block;
        let mut processed_events = 0usize;
        let mut batch_errors = 0u32;

        let mut batch_start = from_block;
        while batch_start < target {
            let batch_end = min(batch_start.saturating_add(self.config.batch_size), target);

            // getLogs ranges are inclusive; the sub-batch covers
            // [batch_start, batch_end)
            let logs = self.client.winner_logs(batch_start, batch_end - 1).await?;

            for raw in &logs {
                match decode_winner_log(raw) {
                    Ok(declaration) => {
                        let rows = declaration.into_events();
                        match self.store.insert_events(rows) {
                            Ok(outcome) => {
                                processed_events += outcome.inserted + outcome.duplicates;
                                if outcome.duplicates > 0 {
                                    tracing::trace!(
                                        duplicates = outcome.duplicates,
                                        "Skipped already-stored winner rows"
                                    );
                                }
                            }
                            Err(e) => {
                                tracing::warn!(%e, "Failed to persist winner rows");
                                batch_errors += 1;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(%e, batch_start, batch_end, "Failed to decode log");
                        batch_errors += 1;
                    }
                }
            }

            last_processed = batch_end;

            if batch_errors > self.config.max_batch_errors {
                tracing::warn!(
                    batch_errors,
                    last_processed,
                    "Batch error budget exhausted, stopping run early"
                );
                break;
            }

            batch_start = batch_end;
        }

        // Partial progress is always durable: whatever was fully processed
        // stays behind the cursor even when the run stopped early.
        if last_processed > from_block {
            self.store
                .advance_cursor(contract, last_processed)
                .map_err(|e| ChainError::StoreWrite(e.to_string()))?;
        }

        let outcome = self.outcome(
            from_block,
            last_processed,
            chain_head,
            processed_events,
            batch_errors,
        );

        tracing::info!(
            from_block = outcome.from_block,
            to_block = outcome.to_block,
            events = outcome.processed_events,
            errors = outcome.batch_errors,
            remaining = outcome.remaining_blocks,
            "Sync run finished"
        );

        Ok(outcome)
    }

    fn outcome(
        &self,
        from_block: u64,
        to_block: u64,
        chain_head: u64,
        processed_events: usize,
        batch_errors: u32,
    ) -> SyncOutcome {
        let remaining_blocks = chain_head.saturating_sub(to_block);
        let span = chain_head.saturating_sub(self.config.deploy_block);
        let progress_percent = if span == 0 {
            100.0
        } else {
            let done = to_block.saturating_sub(self.config.deploy_block);
            (done as f64 / span as f64 * 100.0).min(100.0)
        };

        SyncOutcome {
            from_block,
            to_block,
            chain_head,
            processed_events,
            batch_errors,
            remaining_blocks,
            progress_percent,
            needs_more_sync: remaining_blocks > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::event_types::{RawWinnerLog, WinnersDeclared};
    use alloy_primitives::{Address, B256, U256};
    use alloy_sol_types::SolEvent;
    use parking_lot::Mutex;

    /// Scripted chain for sync tests: a fixed head and a set of logs
    /// keyed by block number.
    struct ScriptedChain {
        head: Result<u64, String>,
        logs: Vec<RawWinnerLog>,
        fail_logs_from: Option<u64>,
        log_calls: Mutex<Vec<(u64, u64)>>,
    }

    impl ScriptedChain {
        fn new(head: u64, logs: Vec<RawWinnerLog>) -> Self {
            Self {
                head: Ok(head),
                logs,
                fail_logs_from: None,
                log_calls: Mutex::new(Vec::new()),
            }
        }

        fn unavailable() -> Self {
            Self {
                head: Err("connection refused".to_string()),
                logs: Vec::new(),
                fail_logs_from: None,
                log_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChainClient for ScriptedChain {
        async fn block_number(&self) -> Result<u64, ChainError> {
            self.head
                .clone()
                .map_err(ChainError::RpcUnavailable)
        }

        async fn winner_logs(&self, from: u64, to: u64) -> Result<Vec<RawWinnerLog>, ChainError> {
            if let Some(fail_from) = self.fail_logs_from {
                if to >= fail_from {
                    return Err(ChainError::RpcUnavailable("log query failed".to_string()));
                }
            }
            self.log_calls.lock().push((from, to));
            Ok(self
                .logs
                .iter()
                .filter(|l| {
                    let block = l.block_number.unwrap_or(0);
                    block >= from && block <= to
                })
                .cloned()
                .collect())
        }
    }

    fn winners_log(round: u64, winners: Vec<&str>, block: u64, tx_byte: u8) -> RawWinnerLog {
        let event = WinnersDeclared {
            round: U256::from(round),
            winners: winners.iter().map(|w| w.to_string()).collect(),
            rewards: winners.iter().map(|_| U256::from(1)).collect(),
        };
        let log_data = event.encode_log_data();
        RawWinnerLog {
            address: Address::repeat_byte(0x42),
            topics: log_data.topics().to_vec(),
            data: log_data.data.clone(),
            block_number: Some(block),
            tx_hash: Some(B256::repeat_byte(tx_byte)),
            block_timestamp: Some(1_700_000_000 + block),
        }
    }

    fn garbage_log(block: u64) -> RawWinnerLog {
        RawWinnerLog {
            address: Address::repeat_byte(0x42),
            topics: vec![WinnersDeclared::SIGNATURE_HASH],
            data: alloy_primitives::Bytes::from(vec![0xff; 3]),
            block_number: Some(block),
            tx_hash: Some(B256::repeat_byte(0xee)),
            block_timestamp: None,
        }
    }

    fn config(deploy: u64, max_run: u64, batch: u64) -> SyncConfig {
        SyncConfig {
            contract_address: "0xc0ffee254729296a45a3885639ac7e10f9d54979".to_string(),
            deploy_block: deploy,
            max_blocks_per_run: max_run,
            batch_size: batch,
            max_batch_errors: 5,
        }
    }

    #[tokio::test]
    async fn syncs_events_and_advances_cursor() {
        let store = Arc::new(EventStore::ephemeral());
        let chain = ScriptedChain::new(
            100,
            vec![
                winners_log(1, vec!["peer-a", "peer-b"], 10, 0x01),
                winners_log(2, vec!["peer-a"], 20, 0x02),
            ],
        );
        let sync = ChainSynchronizer::new(chain, store.clone(), config(0, 1000, 50));

        let outcome = sync.sync().await.unwrap();

        assert_eq!(outcome.from_block, 0);
        assert_eq!(outcome.to_block, 100);
        assert_eq!(outcome.chain_head, 100);
        assert_eq!(outcome.processed_events, 3);
        assert_eq!(outcome.batch_errors, 0);
        assert!(!outcome.needs_more_sync);
        assert_eq!(store.event_count(), 3);
        assert_eq!(
            store.cursor(sync.contract_address()).unwrap().last_synced_block,
            100
        );
    }

    #[tokio::test]
    async fn bounds_a_run_to_max_blocks() {
        let store = Arc::new(EventStore::ephemeral());
        let chain = ScriptedChain::new(10_000, vec![winners_log(1, vec!["peer-a"], 5, 0x01)]);
        let sync = ChainSynchronizer::new(chain, store.clone(), config(0, 100, 50));

        let outcome = sync.sync().await.unwrap();

        assert_eq!(outcome.to_block, 100);
        assert_eq!(outcome.remaining_blocks, 9_900);
        assert!(outcome.needs_more_sync);
        assert!(outcome.progress_percent < 2.0);
    }

    #[tokio::test]
    async fn resumes_from_the_persisted_cursor() {
        let store = Arc::new(EventStore::ephemeral());
        let logs = vec![
            winners_log(1, vec!["peer-a"], 50, 0x01),
            winners_log(2, vec!["peer-b"], 150, 0x02),
        ];

        let sync = ChainSynchronizer::new(
            ScriptedChain::new(200, logs.clone()),
            store.clone(),
            config(0, 100, 100),
        );
        let first = sync.sync().await.unwrap();
        assert_eq!(first.to_block, 100);
        assert_eq!(store.event_count(), 1);

        let second = sync.sync().await.unwrap();
        assert_eq!(second.from_block, 100);
        assert_eq!(second.to_block, 200);
        assert!(!second.needs_more_sync);
        assert_eq!(store.event_count(), 2);
    }

    #[tokio::test]
    async fn interrupted_run_matches_uninterrupted_run() {
        // Chunked sync over [0, 200) in two runs...
        let logs = vec![
            winners_log(1, vec!["peer-a", "peer-b"], 40, 0x01),
            winners_log(2, vec!["peer-a"], 99, 0x02),
            winners_log(3, vec!["peer-c"], 160, 0x03),
        ];
        let chunked_store = Arc::new(EventStore::ephemeral());
        let chunked = ChainSynchronizer::new(
            ScriptedChain::new(200, logs.clone()),
            chunked_store.clone(),
            config(0, 100, 30),
        );
        chunked.sync().await.unwrap();
        chunked.sync().await.unwrap();

        // ...must leave the same store contents as one uninterrupted run.
        let full_store = Arc::new(EventStore::ephemeral());
        let full = ChainSynchronizer::new(
            ScriptedChain::new(200, logs),
            full_store.clone(),
            config(0, 1000, 30),
        );
        full.sync().await.unwrap();

        assert_eq!(chunked_store.events_by_block(), full_store.events_by_block());
    }

    #[tokio::test]
    async fn reprocessing_overlapping_ranges_is_idempotent() {
        let store = Arc::new(EventStore::ephemeral());
        let logs = vec![winners_log(1, vec!["peer-a"], 100, 0x01)];

        // The scanned range is [cursor, target): a run whose target equals
        // the head stops short of the head block itself.
        let sync = ChainSynchronizer::new(
            ScriptedChain::new(100, logs.clone()),
            store.clone(),
            config(0, 1000, 100),
        );
        let outcome = sync.sync().await.unwrap();
        assert_eq!(outcome.processed_events, 0);
        assert_eq!(store.event_count(), 0);

        // Once the head advances, the former head block is picked up.
        let later = ChainSynchronizer::new(
            ScriptedChain::new(200, logs.clone()),
            store.clone(),
            config(0, 1000, 100),
        );
        later.sync().await.unwrap();
        assert_eq!(store.event_count(), 1);

        // A crash after the writes but before the cursor advance leaves
        // rows with no watermark; the rerun re-scans the same range and
        // the duplicate rows are suppressed, not doubled.
        let crashed = Arc::new(EventStore::ephemeral());
        crashed
            .insert_events(decode_winner_log(&logs[0]).unwrap().into_events())
            .unwrap();
        let rerun = ChainSynchronizer::new(
            ScriptedChain::new(200, logs),
            crashed.clone(),
            config(0, 1000, 100),
        );
        let outcome = rerun.sync().await.unwrap();
        assert_eq!(outcome.processed_events, 1);
        assert_eq!(crashed.event_count(), 1);
    }

    #[tokio::test]
    async fn rpc_head_failure_leaves_cursor_untouched() {
        let store = Arc::new(EventStore::ephemeral());
        let sync =
            ChainSynchronizer::new(ScriptedChain::unavailable(), store.clone(), config(0, 100, 50));

        let err = sync.sync().await.unwrap_err();
        assert!(matches!(err, ChainError::RpcUnavailable(_)));
        assert!(store.cursor(sync.contract_address()).is_none());
    }

    #[tokio::test]
    async fn log_query_failure_aborts_without_cursor_advance() {
        let store = Arc::new(EventStore::ephemeral());
        let mut chain = ScriptedChain::new(200, vec![winners_log(1, vec!["peer-a"], 10, 0x01)]);
        chain.fail_logs_from = Some(100);
        let sync = ChainSynchronizer::new(chain, store.clone(), config(0, 1000, 100));

        let err = sync.sync().await.unwrap_err();
        assert!(matches!(err, ChainError::RpcUnavailable(_)));
        // Events from the first sub-batch were written (idempotent, so the
        // retry is safe), but the cursor never moved.
        assert!(store.cursor(sync.contract_address()).is_none());
    }

    #[tokio::test]
    async fn decode_failures_are_counted_not_fatal() {
        let store = Arc::new(EventStore::ephemeral());
        let chain = ScriptedChain::new(
            100,
            vec![
                garbage_log(10),
                winners_log(1, vec!["peer-a"], 20, 0x01),
            ],
        );
        let sync = ChainSynchronizer::new(chain, store.clone(), config(0, 1000, 100));

        let outcome = sync.sync().await.unwrap();
        assert_eq!(outcome.batch_errors, 1);
        assert_eq!(outcome.processed_events, 1);
        assert_eq!(outcome.to_block, 100);
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test]
    async fn stops_early_once_error_budget_is_exhausted() {
        let store = Arc::new(EventStore::ephemeral());
        // Six undecodable logs inside the first sub-batch blow the budget
        // of five; the second sub-batch must never be fetched.
        let logs: Vec<RawWinnerLog> = (0..6).map(|i| garbage_log(10 + i)).collect();
        let chain = ScriptedChain::new(400, logs);
        let sync = ChainSynchronizer::new(chain, store.clone(), config(0, 400, 100));

        let outcome = sync.sync().await.unwrap();

        assert_eq!(outcome.batch_errors, 6);
        assert_eq!(outcome.to_block, 100);
        assert!(outcome.needs_more_sync);
        // Partial progress is durable
        assert_eq!(
            store.cursor(sync.contract_address()).unwrap().last_synced_block,
            100
        );
        assert_eq!(sync.client.log_calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn noop_when_already_at_head() {
        let store = Arc::new(EventStore::ephemeral());
        store.advance_cursor("0xc0ffee254729296a45a3885639ac7e10f9d54979", 100).unwrap();
        let chain = ScriptedChain::new(100, Vec::new());
        let sync = ChainSynchronizer::new(chain, store.clone(), config(0, 1000, 100));

        let outcome = sync.sync().await.unwrap();
        assert_eq!(outcome.from_block, 100);
        assert_eq!(outcome.to_block, 100);
        assert!(!outcome.needs_more_sync);
        assert_eq!(sync.client.log_calls.lock().len(), 0);
    }
}
