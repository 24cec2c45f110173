//! Common types and utilities for Matchbook
//!
//! This crate provides the scalar types and fixed-point price helpers shared
//! by every crate in the workspace, plus the common error type used at the
//! application boundary.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Scalar aliases (`OrderId`, `Price`, `Quantity`, ...)

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{price_from_f64, price_to_f64, OrderId, Price, Quantity, TradeId, PRICE_SCALE};
