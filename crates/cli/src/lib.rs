//! Command-line interface for the `matchbook` binary

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "matchbook")]
#[command(about = "Matchbook - a price-time priority matching engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the matching engine server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// TCP port to listen on
        #[arg(short, long, default_value_t = 8888)]
        port: u16,

        /// Log output format: pretty, json, or compact
        #[arg(long, default_value = "pretty")]
        log_format: String,

        /// Seconds between statistics log lines
        #[arg(long, default_value_t = 10)]
        stats_interval: u64,
    },

    /// Connect to a server and run the interactive trading shell
    Shell {
        /// Server hostname
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(short, long, default_value_t = 8888)]
        port: u16,

        /// Replay a scripted order sequence before the prompt
        #[arg(long)]
        demo: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
