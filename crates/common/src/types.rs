//! Scalar types used across Matchbook
//!
//! Prices are fixed-point integers: the stored value is the decimal price
//! multiplied by [`PRICE_SCALE`], giving four decimal places of precision
//! without any floating point in the matching path.

/// Server-assigned order identifier, allocated monotonically starting at 1.
pub type OrderId = u64;

/// Trade identifier, allocated monotonically starting at 1.
pub type TradeId = u64;

/// Fixed-point price (decimal price × [`PRICE_SCALE`]).
pub type Price = i64;

/// Quantity in whole units.
pub type Quantity = u64;

/// Scaling factor between a decimal price and its fixed-point encoding.
pub const PRICE_SCALE: i64 = 10_000;

/// Convert a decimal price to its fixed-point encoding.
pub fn price_from_f64(value: f64) -> Price {
    (value * PRICE_SCALE as f64).round() as Price
}

/// Convert a fixed-point price back to a decimal for display.
pub fn price_to_f64(price: Price) -> f64 {
    price as f64 / PRICE_SCALE as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_round_trip() {
        assert_eq!(price_from_f64(150.0), 1_500_000);
        assert_eq!(price_from_f64(150.1234), 1_501_234);
        assert_eq!(price_to_f64(1_501_234), 150.1234);
    }

    #[test]
    fn test_price_rounding() {
        // 0.1 has no exact binary representation; rounding keeps the
        // encoding stable
        assert_eq!(price_from_f64(0.1), 1_000);
        assert_eq!(price_from_f64(99.9999), 999_999);
    }

    #[test]
    fn test_negative_price_encoding() {
        assert_eq!(price_from_f64(-1.5), -15_000);
        assert_eq!(price_to_f64(-15_000), -1.5);
    }
}
