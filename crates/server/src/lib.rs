//! TCP transport for the Matchbook matching engine
//!
//! This crate carries fixed-layout wire frames between clients and the
//! matching core. Each accepted connection runs its own session task that
//! decodes commands, drives the engine, and streams acknowledgements,
//! execution reports, and market-data snapshots back to the client.
//!
//! Shutdown coordination uses `CancellationToken` from `tokio_util`:
//! cancelling the server token cancels every session token with it.
//!
//! # Quick Start
//!
//! ```ignore
//! use server::{EngineServer, ServerConfig, ServerExt};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = EngineServer::new(ServerConfig::new("0.0.0.0", 8888));
//!     server.run_with_ctrl_c().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`] - Bind address and stats interval
//! - [`traits`] - `Server` and `ServerExt` traits
//! - [`session`] - Per-connection command loop
//! - [`error`] - Server error type

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use matching_engine::MatchingEngine;
use parking_lot::RwLock as SyncRwLock;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod config;
pub mod error;
mod session;
pub mod traits;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::{Result, ServerError};
pub use traits::{Server, ServerExt};

/// TCP server fronting one [`MatchingEngine`]
///
/// Cloning is cheap: clones share the engine and all runtime state, which
/// lets a test spawn one clone while querying the other for the bound
/// address.
#[derive(Clone)]
pub struct EngineServer {
    name: String,
    config: ServerConfig,
    engine: Arc<MatchingEngine>,
    running: Arc<AtomicBool>,
    bound_addr: Arc<SyncRwLock<Option<SocketAddr>>>,
    next_conn_id: Arc<AtomicU64>,
    active_connections: Arc<AtomicU64>,
}

impl EngineServer {
    /// Create a server with a fresh engine
    ///
    /// The engine's observer callbacks are wired to structured logging, so
    /// every order update and trade shows up in the server's log stream.
    pub fn new(config: ServerConfig) -> Self {
        let engine = Arc::new(MatchingEngine::new());
        engine.set_order_callback(|order| info!(target: "engine", %order, "order update"));
        engine.set_trade_callback(|trade| info!(target: "engine", %trade, "trade executed"));

        Self {
            name: "matchbook".into(),
            config,
            engine,
            running: Arc::new(AtomicBool::new(false)),
            bound_addr: Arc::new(SyncRwLock::new(None)),
            next_conn_id: Arc::new(AtomicU64::new(1)),
            active_connections: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The engine behind this server
    pub fn engine(&self) -> &Arc<MatchingEngine> {
        &self.engine
    }

    /// Number of currently connected clients
    pub fn connection_count(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Periodically log connection and matching statistics
    async fn stats_loop(
        engine: Arc<MatchingEngine>,
        active: Arc<AtomicU64>,
        interval_secs: u64,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.tick().await; // the first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    info!(
                        active_connections = active.load(Ordering::Relaxed),
                        total_orders = engine.total_orders(),
                        total_trades = engine.total_trades(),
                        "server statistics"
                    );
                }
            }
        }
    }
}

#[async_trait]
impl Server for EngineServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Option<SocketAddr> {
        *self.bound_addr.read()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.config.addr()?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        *self.bound_addr.write() = Some(local_addr);
        self.running.store(true, Ordering::Relaxed);
        info!(server = %self.name, %local_addr, "server started");

        tokio::spawn(Self::stats_loop(
            self.engine.clone(),
            self.active_connections.clone(),
            self.config.stats_interval_secs,
            shutdown.child_token(),
        ));

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(server = %self.name, "shutdown signal received");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(%e, "failed to accept connection");
                            continue;
                        }
                    };

                    let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
                    let active = self.active_connections.clone();
                    let count = active.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(conn_id, %peer_addr, active_connections = count, "client connected");

                    let engine = self.engine.clone();
                    let session_token = shutdown.child_token();
                    tokio::spawn(async move {
                        if let Err(e) =
                            session::run_session(engine, stream, conn_id, session_token).await
                        {
                            warn!(conn_id, %e, "session ended with error");
                        }
                        let remaining = active.fetch_sub(1, Ordering::Relaxed) - 1;
                        info!(conn_id, active_connections = remaining, "client disconnected");
                    });
                }
            }
        }

        self.running.store(false, Ordering::Relaxed);
        info!(server = %self.name, "server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_binds_and_shuts_down() {
        let server = EngineServer::new(ServerConfig::new("127.0.0.1", 0));
        let observer = server.clone();
        let (handle, token) = server.spawn();

        // wait for the listener to come up
        let mut addr = None;
        for _ in 0..100 {
            if let Some(bound) = observer.address() {
                addr = Some(bound);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(addr.is_some(), "server should bind an ephemeral port");
        assert!(observer.is_running());

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "server should shut down within timeout");
        assert!(!observer.is_running());
    }
}
