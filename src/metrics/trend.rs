//! Trend classification from the two most recent observations.

use crate::domain::{Trend, TrendReading};
use crate::error::AppError;

use super::round_to;

/// Classify the move from `previous` to `latest`.
///
/// A zero change counts as cooling. A zero baseline has no defined percent
/// change and is reported as a domain error.
pub fn classify(latest: f64, previous: f64) -> Result<TrendReading, AppError> {
    if !(latest.is_finite() && previous.is_finite()) {
        return Err(AppError::domain(format!(
            "Non-finite values in trend input (latest={latest}, previous={previous})."
        )));
    }
    if previous == 0.0 {
        return Err(AppError::domain(
            "Previous value is zero; percent change is undefined.",
        ));
    }

    let raw = (latest - previous) / previous * 100.0;
    if !raw.is_finite() {
        return Err(AppError::domain(format!(
            "Percent change from {previous} to {latest} is not finite."
        )));
    }
    let change_pct = round_to(raw, 2);
    let trend = if change_pct > 0.0 {
        Trend::Heating
    } else {
        Trend::Cooling
    };

    Ok(TrendReading {
        latest,
        previous,
        change_pct,
        trend,
    })
}

/// Classify the last two values of `series`.
pub fn classify_series(series: &[f64]) -> Result<TrendReading, AppError> {
    match series {
        [.., previous, latest] => classify(*latest, *previous),
        _ => Err(AppError::data(format!(
            "Need at least 2 values to classify a trend, got {}.",
            series.len()
        ))),
    }
}
