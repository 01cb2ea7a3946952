use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use common::event_store::{EventStore, StoreConfig};
use tracker::api::{AppState, HttpApi};
use tracker::chain::{ChainSynchronizer, RpcChainClient, SyncConfig};
use tracker::config::TrackerConfig;
use tracker::driver::{DriverConfig, SyncDriver};
use tracker::leaderboard::{Aggregator, LeaderboardCache};
use tracker::upstream::RankingApiClient;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "./configs/tracker.json")]
    config_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run the in-process sync driver regardless of the config file
    #[arg(long)]
    auto_sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting swarm leaderboard tracker");

    let config_path = PathBuf::from(&cli.config_path);
    let config = if config_path.exists() {
        TrackerConfig::load_from_file(&config_path)
            .await?
            .with_env_overrides()
    } else {
        tracing::warn!(path = %cli.config_path, "Config file not found, using defaults");
        TrackerConfig::default().with_env_overrides()
    };

    tracing::info!(
        rpc = %config.chain.rpc_url,
        coordinator = %config.chain.coordinator_address,
        upstream = %config.upstream.base_url,
        store = %config.store.path,
        "Config loaded"
    );

    let store = Arc::new(EventStore::open(StoreConfig::new(config.store.path.clone()))?);
    tracing::info!(
        events = store.event_count(),
        peers = store.distinct_peer_count(),
        "Event store opened"
    );

    let chain_client = RpcChainClient::new(
        config.chain.rpc_url.clone(),
        &config.chain.coordinator_address,
    )?;
    let synchronizer = Arc::new(ChainSynchronizer::new(
        chain_client,
        store.clone(),
        SyncConfig {
            contract_address: config.chain.coordinator_address.clone(),
            deploy_block: config.chain.deploy_block,
            max_blocks_per_run: config.chain.max_blocks_per_run,
            batch_size: config.chain.batch_size,
            max_batch_errors: 5,
        },
    ));

    let api_client = RankingApiClient::new(
        config.upstream.base_url.clone(),
        config.upstream.timeout_secs,
        config.upstream.retry_attempts,
    );
    let cache = Arc::new(LeaderboardCache::new(config.cache.ttl_secs));
    let aggregator = Arc::new(Aggregator::new(api_client, store.clone(), cache.clone()));

    let sync_lock = Arc::new(tokio::sync::Mutex::new(()));

    let state = AppState {
        aggregator,
        synchronizer: synchronizer.clone(),
        store: store.clone(),
        cache: cache.clone(),
        sync_lock: sync_lock.clone(),
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let api = HttpApi::new(state, addr);
    let api_shutdown = api.shutdown_handle();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = api.serve().await {
            tracing::error!(%e, "API server failed");
        }
    });

    let driver_handle = if cli.auto_sync || config.auto_sync.enabled {
        let driver = Arc::new(SyncDriver::new(
            synchronizer,
            cache,
            sync_lock,
            DriverConfig {
                interval_secs: config.auto_sync.interval_secs,
            },
        ));
        let driver_cancel = driver.cancel_token();
        let handle = tokio::spawn(async move {
            if let Err(e) = driver.run().await {
                tracing::error!("Sync driver error: {:?}", e);
            }
        });
        tracing::info!(interval_secs = config.auto_sync.interval_secs, "Auto-sync enabled");
        Some((handle, driver_cancel))
    } else {
        tracing::info!("Auto-sync disabled; sync runs via POST /sync");
        None
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    api_shutdown.cancel();
    if let Some((handle, cancel)) = driver_handle {
        cancel.cancel();
        let _ = handle.await;
    }
    let _ = server_handle.await;

    tracing::info!("Tracker stopped");
    Ok(())
}
