//! Handlers for the leaderboard, sync, and health endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use common::event_store::EventStore;
use tokio::sync::Mutex;

use super::types::{
    ErrorResponse, HealthResponse, LeaderboardQuery, LeaderboardResponse, SyncResponse,
};
use crate::chain::{ChainClient, ChainSynchronizer};
use crate::leaderboard::{Aggregator, LeaderboardCache};
use crate::upstream::UpstreamSource;

/// Shared application state, generic over the chain and upstream seams
pub struct AppState<C: ChainClient, U: UpstreamSource> {
    pub aggregator: Arc<Aggregator<U>>,
    pub synchronizer: Arc<ChainSynchronizer<C>>,
    pub store: Arc<EventStore>,
    pub cache: Arc<LeaderboardCache>,
    /// Serializes sync runs; at most one may be advancing the cursor
    pub sync_lock: Arc<Mutex<()>>,
}

impl<C: ChainClient, U: UpstreamSource> Clone for AppState<C, U> {
    fn clone(&self) -> Self {
        Self {
            aggregator: self.aggregator.clone(),
            synchronizer: self.synchronizer.clone(),
            store: self.store.clone(),
            cache: self.cache.clone(),
            sync_lock: self.sync_lock.clone(),
        }
    }
}

/// `GET /leaderboard?limit&offset`
pub async fn get_leaderboard<C, U>(
    State(state): State<AppState<C, U>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, (StatusCode, Json<ErrorResponse>)>
where
    C: ChainClient + 'static,
    U: UpstreamSource + 'static,
{
    let result = state.aggregator.build_leaderboard().await.map_err(|e| {
        tracing::error!(%e, "Leaderboard build failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    let board = result.leaderboard;
    let total = board.entries.len();
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(total);

    let entries: Vec<_> = board
        .entries
        .iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    tracing::debug!(
        total,
        offset,
        page = entries.len(),
        from_cache = result.from_cache,
        "Serving leaderboard page"
    );

    Ok(Json(LeaderboardResponse {
        entries,
        total,
        updated_at: board.updated_at,
        built_at: board.built_at,
        stale: result.stale,
        stats: board.stats,
    }))
}

/// `POST /sync`: run one bounded sync cycle.
///
/// Calls are serialized through `sync_lock`; a successful cycle that made
/// progress force-invalidates the result cache so the next leaderboard
/// request sees the new events.
pub async fn post_sync<C, U>(
    State(state): State<AppState<C, U>>,
) -> (StatusCode, Json<SyncResponse>)
where
    C: ChainClient + 'static,
    U: UpstreamSource + 'static,
{
    let _guard = state.sync_lock.lock().await;

    let resume_from = state
        .store
        .cursor(state.synchronizer.contract_address())
        .map(|c| c.last_synced_block)
        .unwrap_or(0);

    match state.synchronizer.sync().await {
        Ok(outcome) => {
            if outcome.to_block > outcome.from_block {
                state.cache.invalidate();
            }
            (StatusCode::OK, Json(SyncResponse::from_outcome(&outcome)))
        }
        Err(e) => {
            tracing::error!(%e, resume_from, "Sync run failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(SyncResponse::failure(resume_from, e.to_string())),
            )
        }
    }
}

/// `GET /health`
pub async fn health<C, U>(State(state): State<AppState<C, U>>) -> Json<HealthResponse>
where
    C: ChainClient + 'static,
    U: UpstreamSource + 'static,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        stored_events: state.store.event_count(),
        tracked_peers: state.store.distinct_peer_count(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
