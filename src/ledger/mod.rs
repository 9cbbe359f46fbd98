// src/ledger/mod.rs
// FIFO lot accounting and timeline replay

pub mod portfolio;
pub mod stats;

pub use portfolio::{Batch, Portfolio, PortfolioStock, RealizedSale};
pub use stats::{Stats, StatsKind, Timeline};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Simple return of `value` against `invested`: `value / invested - 1`.
///
/// Zero when either side is zero, so no return is reported before capital is
/// at risk.
pub fn simple_return(invested: Decimal, value: Decimal) -> f64 {
    if invested.is_zero() || value.is_zero() {
        return 0.0;
    }
    if invested < Decimal::ZERO {
        // computed as-is
        log::warn!(
            "Computing return against a negative invested base {} (value {})",
            invested,
            value
        );
    }
    ratio(value, invested) - 1.0
}

pub(crate) fn ratio(numerator: Decimal, denominator: Decimal) -> f64 {
    match numerator.checked_div(denominator) {
        Some(q) => q.to_f64().unwrap_or_default(),
        None => {
            numerator.to_f64().unwrap_or_default() / denominator.to_f64().unwrap_or_default()
        }
    }
}
