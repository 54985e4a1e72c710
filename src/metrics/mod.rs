//! Market metrics core.
//!
//! Responsibilities:
//!
//! - pick the trailing series from a wide CSV row (`extractor`)
//! - classify the latest move (`trend`)
//! - derive heuristic velocity/inventory indicators (`derived`)
//! - assemble the per-ZIP snapshot (`snapshot`)
//!
//! Everything here is pure; file and network access live in `io` and `data`.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::ToPrimitive;

pub mod derived;
pub mod extractor;
pub mod snapshot;
pub mod trend;

pub use derived::*;
pub use extractor::*;
pub use snapshot::*;
pub use trend::*;

/// Round to `decimals` places with ties going to the even digit, judged on
/// the exact binary value: `0.125` becomes `0.12`, and `2.675` (stored as
/// `2.67499...`) becomes `2.67`. Negative zero is normalized.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    // Any magnitude >= 2^-8 prints exactly at 60 places; smaller values
    // round to zero at the precisions used here either way.
    let Ok(exact) = BigDecimal::from_str(&format!("{value:.60}")) else {
        return value;
    };
    let rounded = exact
        .with_scale_round(i64::from(decimals), RoundingMode::HalfEven)
        .to_f64()
        .unwrap_or(value);
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(1.578_947, 2), 1.58);
        assert_eq!(round_to(-9.090_909, 2), -9.09);
        assert_eq!(round_to(9.09, 1), 9.1);
        assert!(round_to(-0.0, 1).is_sign_positive());
    }

    #[test]
    fn ties_go_to_even_on_the_stored_value() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(-0.25, 1), -0.2);
        // 2.675 is stored just below the tie.
        assert_eq!(round_to(2.675, 2), 2.67);
        // 0.05 is stored just above it.
        assert_eq!(round_to(0.05, 1), 0.1);
        assert!(round_to(-0.04, 1).is_sign_positive());
        assert!(round_to(f64::INFINITY, 2).is_infinite());
    }
}
