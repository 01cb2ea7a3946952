//! Service configuration: JSON file with environment overrides.

use std::path::Path;

use common::event_store::STORE_PATH_ENV_VAR;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub upstream: UpstreamConfig,
    pub store: StoreSection,
    pub cache: CacheConfig,
    pub auto_sync: AutoSyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub coordinator_address: String,
    /// Coordinator deployment height; history below it holds no events
    pub deploy_block: u64,
    pub max_blocks_per_run: u64,
    /// Blocks per getLogs call, matching the RPC provider's range limit
    pub batch_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSyncConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl TrackerConfig {
    pub async fn load_from_file(path: &Path) -> eyre::Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Apply deploy-sensitive environment overrides on top of the file
    pub fn with_env_overrides(mut self) -> Self {
        self.chain = self.chain.with_env_overrides();
        self.upstream = self.upstream.with_env_overrides();
        if let Ok(v) = std::env::var(STORE_PATH_ENV_VAR) {
            if !v.trim().is_empty() {
                self.store.path = v;
            }
        }
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(port) = v.trim().parse() {
                self.server.port = port;
            }
        }
        self
    }
}

impl ChainConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("TRACKER_RPC_URL") {
            if !v.trim().is_empty() {
                self.rpc_url = v;
            }
        }
        if let Ok(v) = std::env::var("TRACKER_COORDINATOR_ADDRESS") {
            if !v.trim().is_empty() {
                self.coordinator_address = v;
            }
        }
        self
    }
}

impl UpstreamConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("TRACKER_UPSTREAM_URL") {
            if !v.trim().is_empty() {
                self.base_url = v;
            }
        }
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            chain: ChainConfig {
                rpc_url: "http://localhost:8545".to_string(),
                coordinator_address: "0x0000000000000000000000000000000000000000".to_string(),
                deploy_block: 0,
                max_blocks_per_run: 10_000,
                batch_size: 500,
            },
            upstream: UpstreamConfig {
                base_url: "http://localhost:3000".to_string(),
                timeout_secs: 10,
                retry_attempts: 3,
            },
            store: StoreSection {
                path: "./winner-events.jsonl".to_string(),
            },
            cache: CacheConfig { ttl_secs: 60 },
            auto_sync: AutoSyncConfig {
                enabled: false,
                interval_secs: 15,
            },
        }
    }
}
