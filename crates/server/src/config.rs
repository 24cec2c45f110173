//! Server configuration

use std::net::SocketAddr;

use crate::error::{Result, ServerError};

/// Default TCP port for the matching gateway
pub const DEFAULT_PORT: u16 = 8888;

/// Default interval between statistics log lines, in seconds
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 10;

/// Transport server configuration
///
/// # Example
///
/// ```
/// use server::config::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1", 8888);
/// assert!(config.addr().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g. "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// TCP port; 0 asks the OS for an ephemeral port
    pub port: u16,
    /// Seconds between statistics log lines
    pub stats_interval_secs: u64,
}

impl ServerConfig {
    /// Create a config with the default stats interval
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stats_interval_secs: DEFAULT_STATS_INTERVAL_SECS,
        }
    }

    /// Override the statistics interval
    pub fn with_stats_interval(mut self, secs: u64) -> Self {
        self.stats_interval_secs = secs;
        self
    }

    /// Parse the bind address
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", DEFAULT_PORT)
    }
}
