//! Observability infrastructure for Matchbook
//!
//! Structured logging via tracing, with the output format selectable at
//! startup.
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("matchbook", LogFormat::Pretty)?;
//! tracing::info!("ready");
//! ```

pub mod logging;

pub use logging::{init_logging, LogFormat};
