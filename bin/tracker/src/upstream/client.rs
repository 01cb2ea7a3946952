//! HTTP client for the public ranking API.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::types::{parse_leaderboard, pick_u64, ApiLeaderboard, NetworkCounters};

/// Upstream view needed by the aggregator.
///
/// Production uses [`RankingApiClient`]; tests substitute a counting mock
/// to verify cache behavior without the network.
#[async_trait::async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Current top-N leaderboard snapshot
    async fn leaderboard(&self) -> eyre::Result<ApiLeaderboard>;

    /// Display-only counters; individual endpoint failures degrade to
    /// `None`, never to an error
    async fn counters(&self) -> NetworkCounters;
}

#[derive(Clone)]
pub struct RankingApiClient {
    client: Client,
    base_url: String,
    retry_attempts: u32,
}

impl RankingApiClient {
    pub fn new(base_url: String, timeout_secs: u64, retry_attempts: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_attempts,
        }
    }

    async fn fetch_json(&self, path: &str) -> eyre::Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut last_error = None;
        for attempt in 1..=self.retry_attempts.max(1) {
            match self.try_fetch(&url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!(
                        %url,
                        attempt,
                        attempts = self.retry_attempts,
                        ?e,
                        "Upstream request failed"
                    );
                    last_error = Some(e);
                    if attempt < self.retry_attempts {
                        tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| eyre::eyre!("All retry attempts failed")))
    }

    async fn try_fetch(&self, url: &str) -> eyre::Result<Value> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            eyre::bail!("Request failed: HTTP {}", response.status());
        }
        Ok(response.json().await?)
    }

    /// Fetch one scalar counter, tolerating the endpoint's field variants
    async fn fetch_counter(&self, path: &str, names: &[&str]) -> Option<u64> {
        match self.fetch_json(path).await {
            Ok(body) => {
                // Some counter endpoints return a bare number
                body.as_u64().or_else(|| pick_u64(&body, names))
            }
            Err(e) => {
                tracing::debug!(%path, ?e, "Counter endpoint unavailable");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl UpstreamSource for RankingApiClient {
    async fn leaderboard(&self) -> eyre::Result<ApiLeaderboard> {
        let body = self.fetch_json("/leaderboard").await?;
        let snapshot = parse_leaderboard(&body);
        tracing::debug!(peers = snapshot.peers.len(), "Fetched leaderboard snapshot");
        Ok(snapshot)
    }

    async fn counters(&self) -> NetworkCounters {
        let (network_peers, nodes_connected, unique_voters) = tokio::join!(
            self.fetch_counter("/network-stats", &["networkPeers", "totalPeers", "peers"]),
            self.fetch_counter("/nodes-connected", &["nodesConnected", "connected", "count"]),
            self.fetch_counter("/unique-voters", &["uniqueVoters", "voters", "count"]),
        );

        NetworkCounters {
            network_peers,
            nodes_connected,
            unique_voters,
        }
    }
}
