//! Server trait for lifecycle handling
//!
//! [`Server`] gives the binary and the tests one interface for running and
//! monitoring the transport; [`ServerExt`] adds the common spawn/Ctrl+C
//! patterns on top of it.

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;

/// A runnable network server
#[async_trait]
pub trait Server: Send + Sync + 'static {
    /// Name for logging and identification
    fn name(&self) -> &str;

    /// The bound address, once the server is running
    fn address(&self) -> Option<SocketAddr>;

    /// True while the accept loop is active
    fn is_running(&self) -> bool;

    /// Run until the shutdown token is cancelled
    ///
    /// Binds the configured address, serves connections, and returns after
    /// a clean shutdown. Errors indicate a failure to start or a fatal
    /// runtime fault.
    async fn run(&self, shutdown: CancellationToken) -> Result<()>;
}

/// Convenience methods available on every [`Server`]
pub trait ServerExt: Server + Sized {
    /// Spawn the server on a background task
    ///
    /// Returns the join handle and the token that triggers shutdown.
    fn spawn(self) -> (tokio::task::JoinHandle<Result<()>>, CancellationToken) {
        let token = CancellationToken::new();
        let token_clone = token.clone();
        let handle = tokio::spawn(async move { self.run(token_clone).await });
        (handle, token)
    }

    /// Run the server until Ctrl+C
    ///
    /// Spawns a task that cancels the shutdown token when Ctrl+C arrives,
    /// then runs the server on that token.
    fn run_with_ctrl_c(self) -> impl std::future::Future<Output = Result<()>> + Send {
        async move {
            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Received Ctrl+C, initiating graceful shutdown...");
                        signal.cancel();
                    }
                    Err(e) => {
                        warn!("Failed to listen for Ctrl+C: {}", e);
                    }
                }
            });
            self.run(shutdown).await
        }
    }
}

impl<T: Server + Sized> ServerExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct IdleServer;

    #[async_trait]
    impl Server for IdleServer {
        fn name(&self) -> &str {
            "idle"
        }

        fn address(&self) -> Option<SocketAddr> {
            None
        }

        fn is_running(&self) -> bool {
            false
        }

        async fn run(&self, shutdown: CancellationToken) -> Result<()> {
            shutdown.cancelled().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_spawn_and_cancel() {
        let (handle, token) = IdleServer.spawn();
        token.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
        assert!(result.is_ok());
    }
}
