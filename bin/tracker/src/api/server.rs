//! Router assembly and the serving loop.

use std::net::SocketAddr;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use super::routes::{get_leaderboard, health, post_sync, AppState};
use crate::chain::ChainClient;
use crate::upstream::UpstreamSource;

/// Failures of the serving loop itself
#[derive(Debug)]
pub enum ServeError {
    /// The listen address could not be bound
    Bind { addr: SocketAddr, reason: String },
    /// The accept loop died
    Serve { reason: String },
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::Bind { addr, reason } => {
                write!(f, "Could not bind API listener on {}: {}", addr, reason)
            }
            ServeError::Serve { reason } => write!(f, "API accept loop failed: {}", reason),
        }
    }
}

impl std::error::Error for ServeError {}

/// Assemble the tracker's route table over the shared state.
///
/// Everything served here is public read data (the sync trigger included),
/// so CORS is fully open and there is no auth layer.
pub fn router<C, U>(state: AppState<C, U>) -> Router
where
    C: ChainClient + 'static,
    U: UpstreamSource + 'static,
{
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::<C, U>))
        .route("/leaderboard", get(get_leaderboard::<C, U>))
        .route("/sync", post(post_sync::<C, U>))
        .layer(cors)
        .with_state(state)
}

/// Serves the tracker API until its shutdown handle fires.
///
/// The route table is assembled up front, so the handle itself is not
/// generic over the chain and upstream seams.
pub struct HttpApi {
    router: Router,
    bind_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl HttpApi {
    pub fn new<C, U>(state: AppState<C, U>, bind_addr: SocketAddr) -> Self
    where
        C: ChainClient + 'static,
        U: UpstreamSource + 'static,
    {
        Self {
            router: router(state),
            bind_addr,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`serve`](Self::serve) when cancelled
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind the listener and run the accept loop until shutdown.
    pub async fn serve(self) -> Result<(), ServeError> {
        let listener = tokio::net::TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| ServeError::Bind {
                addr: self.bind_addr,
                reason: e.to_string(),
            })?;

        tracing::info!(
            addr = %self.bind_addr,
            routes = "GET /health, GET /leaderboard, POST /sync",
            "Tracker API listening"
        );

        let shutdown = self.shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ServeError::Serve {
                reason: e.to_string(),
            })
    }
}
