//! Matchbook server and shell binary
//!
//! `matchbook serve` runs the matching engine behind its TCP transport;
//! `matchbook shell` connects to a running server and provides an
//! interactive trading prompt.

use anyhow::{anyhow, Context, Result};
use cli::{Cli, Commands};
use observability::{init_logging, LogFormat};
use server::{EngineServer, ServerConfig, ServerExt};
use tracing::{debug, info};

mod shell;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Serve {
            host,
            port,
            log_format,
            stats_interval,
        } => {
            let format: LogFormat = log_format
                .parse()
                .map_err(|e| anyhow!("{}", e))
                .context("invalid --log-format")?;
            init_logging("matchbook", format)?;

            info!(host, port, "starting matchbook server");
            debug!(stats_interval, "configuration");

            let config = ServerConfig::new(host, port).with_stats_interval(stats_interval);
            let server = EngineServer::new(config);
            server.run_with_ctrl_c().await?;
            Ok(())
        }
        Commands::Shell { host, port, demo } => shell::run(host, port, demo).await,
    }
}
