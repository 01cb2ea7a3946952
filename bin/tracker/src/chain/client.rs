//! Chain client seam over the RPC endpoint.

use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use alloy_primitives::Address;
use alloy_sol_types::SolEvent;

use super::errors::ChainError;
use super::event_types::{RawWinnerLog, WinnersDeclared};

/// Read-only view of the chain needed by the synchronizer.
///
/// Production uses [`RpcChainClient`]; tests substitute a scripted
/// implementation so sync behavior is exercised without a node.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain head
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// `WinnersDeclared` logs emitted by the coordinator in the inclusive
    /// block range `[from, to]`
    async fn winner_logs(&self, from: u64, to: u64) -> Result<Vec<RawWinnerLog>, ChainError>;
}

/// HTTP RPC implementation of [`ChainClient`]
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    rpc_url: String,
    coordinator: Address,
}

impl RpcChainClient {
    pub fn new(rpc_url: String, coordinator_address: &str) -> Result<Self, ChainError> {
        let coordinator: Address = coordinator_address
            .parse()
            .map_err(|e| ChainError::InvalidAddress(format!("{}: {}", coordinator_address, e)))?;
        Ok(Self {
            rpc_url,
            coordinator,
        })
    }

    fn provider(&self) -> Result<impl Provider, ChainError> {
        Ok(ProviderBuilder::new().connect_http(
            self.rpc_url
                .parse()
                .map_err(|e| ChainError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?,
        ))
    }
}

#[async_trait::async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        let provider = self.provider()?;
        provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::RpcUnavailable(format!("Failed to get block number: {}", e)))
    }

    async fn winner_logs(&self, from: u64, to: u64) -> Result<Vec<RawWinnerLog>, ChainError> {
        let provider = self.provider()?;

        let filter = Filter::new()
            .address(self.coordinator)
            .event_signature(WinnersDeclared::SIGNATURE_HASH)
            .from_block(from)
            .to_block(to);

        let logs = provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::RpcUnavailable(format!("Failed to get logs: {}", e)))?;

        Ok(logs
            .into_iter()
            .map(|log| RawWinnerLog {
                address: log.inner.address,
                topics: log.inner.data.topics().to_vec(),
                data: log.inner.data.data.clone(),
                block_number: log.block_number,
                tx_hash: log.transaction_hash,
                block_timestamp: log.block_timestamp,
            })
            .collect())
    }
}
