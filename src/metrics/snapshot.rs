//! Snapshot assembly: extractor → classifier → derived metrics → record.

use chrono::NaiveDate;

use crate::domain::{DerivedMetrics, Granularity, MarketProfile, MarketSnapshot, TrendReading};
use crate::error::AppError;

use super::derived::derive_metrics;
use super::extractor::{SelectedSeries, extract_tail, select_series};
use super::trend::classify_series;

/// Package already-computed parts into a snapshot.
pub fn assemble(
    identifier: &str,
    observed_at: NaiveDate,
    granularity: Granularity,
    series: SelectedSeries,
    reading: TrendReading,
    derived: DerivedMetrics,
) -> MarketSnapshot {
    MarketSnapshot {
        identifier: identifier.to_string(),
        observed_at,
        granularity,
        latest_value: reading.latest,
        previous_value: reading.previous,
        trend: reading.trend,
        change_pct: reading.change_pct,
        derived,
        history: series.values,
        used_fallback: series.used_fallback,
    }
}

/// Build a snapshot for `zip` from its CSV row.
///
/// `cells` is `None` when the ZIP has no row (or no CSV was found); the
/// profile's fallback series is used in that case, as it is for rows with
/// fewer than two numeric cells.
pub fn build_snapshot(
    zip: &str,
    cells: Option<&[(String, String)]>,
    profile: &MarketProfile,
    observed_at: NaiveDate,
) -> Result<MarketSnapshot, AppError> {
    let raw = cells
        .map(|c| extract_tail(c, profile.history_len))
        .unwrap_or_default();
    let series = select_series(raw, &profile.fallback_series);
    if series.used_fallback {
        log::warn!("Not enough historical data for ZIP {zip}, using fallback series");
    }

    let reading = classify_series(&series.values)?;
    let derived = derive_metrics(reading.trend, reading.change_pct, reading.latest);

    Ok(assemble(
        zip,
        observed_at,
        profile.granularity,
        series,
        reading,
        derived,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketFile, Trend};
    use crate::metrics::round_to;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn cells(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn end_to_end_heating_row() {
        let row = cells(&[
            ("2024-01", "280000"),
            ("2024-02", "282000"),
            ("2024-03", "285000"),
            ("2024-04", "289500"),
        ]);
        let snap = build_snapshot("31088", Some(&row), &MarketProfile::default(), day()).unwrap();
        assert_eq!(snap.change_pct, 1.58);
        assert_eq!(snap.trend, Trend::Heating);
        assert_eq!(snap.derived.median_sale, 280_815);
        assert_eq!(snap.derived.inventory_proxy, 63);
        assert!(!snap.used_fallback);
        assert_eq!(snap.history, vec![280000.0, 282000.0, 285000.0, 289500.0]);
    }

    #[test]
    fn stored_change_matches_history() {
        let row = cells(&[("2024-01", "310000"), ("2024-02", "305500"), ("2024-03", "306100")]);
        let snap = build_snapshot("31093", Some(&row), &MarketProfile::default(), day()).unwrap();
        let n = snap.history.len();
        let recomputed = round_to(
            (snap.history[n - 1] - snap.history[n - 2]) / snap.history[n - 2] * 100.0,
            2,
        );
        assert_eq!(recomputed, snap.change_pct);
        assert_eq!(snap.trend == Trend::Heating, snap.change_pct > 0.0);
    }

    #[test]
    fn sparse_row_uses_fallback_series() {
        let row = cells(&[("2024-03", ""), ("2024-04", "289500")]);
        let profile = MarketProfile::default();
        let snap = build_snapshot("31098", Some(&row), &profile, day()).unwrap();
        assert!(snap.used_fallback);
        assert_eq!(snap.history, profile.fallback_series);
        assert_eq!(snap.change_pct, 1.58);

        let file = MarketFile::from_snapshot(&snap, &profile);
        assert_eq!(file.pricing.median_list, 289_500);
        assert_eq!(file.city, "Bonaire");
    }

    #[test]
    fn missing_row_uses_fallback_series() {
        let snap = build_snapshot("31088", None, &MarketProfile::default(), day()).unwrap();
        assert!(snap.used_fallback);
        assert_eq!(snap.history.len(), 4);
    }

    #[test]
    fn zero_baseline_propagates() {
        let row = cells(&[("2024-01", "0"), ("2024-02", "1000")]);
        assert!(build_snapshot("31088", Some(&row), &MarketProfile::default(), day()).is_err());
    }
}
