//! Matching engine error types

use thiserror::Error;

/// Why a submitted order was rejected before touching the book
///
/// Well-formed input is the transport's responsibility; these checks are the
/// engine's last line of defense. A rejected order gets status `Rejected`
/// and the book is left untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Quantity must be positive
    #[error("quantity must be positive")]
    ZeroQuantity,

    /// Symbol must not be empty
    #[error("symbol must not be empty")]
    EmptySymbol,

    /// Symbol exceeds the wire limit
    #[error("symbol exceeds {0} bytes")]
    SymbolTooLong(usize),

    /// Limit-priced orders need a positive limit price
    #[error("limit price must be positive")]
    NonPositivePrice,

    /// Stop orders need a positive stop price
    #[error("stop price must be positive")]
    NonPositiveStopPrice,
}
