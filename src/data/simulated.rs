//! Seeded synthetic ZHVI table for offline runs.
//!
//! Values follow a random walk `v *= 1 + U(-1%, +2%)` per month from a fixed
//! base, so a given seed always produces the same CSV.

use std::fs::{self, File};
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::AppError;

const BASE_VALUE: f64 = 285_000.0;
const STEP_MIN: f64 = -0.01;
const STEP_MAX: f64 = 0.02;

const LEADING_COLUMNS: [&str; 6] = [
    "RegionID",
    "SizeRank",
    "RegionName",
    "RegionType",
    "StateName",
    "City",
];

#[derive(Debug, Clone)]
pub struct SimulatedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Last calendar day of `year`-`month`.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|d| d - Duration::days(1))
}

/// `months` month-end dates, oldest first, ending with the month of `end`.
pub fn month_ends(end: NaiveDate, months: usize) -> Result<Vec<NaiveDate>, AppError> {
    let mut out = Vec::with_capacity(months);
    let mut year = end.year();
    let mut month = end.month();
    for _ in 0..months {
        let date = month_end(year, month)
            .ok_or_else(|| AppError::usage(format!("Invalid month {year}-{month:02}.")))?;
        out.push(date);
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    out.reverse();
    Ok(out)
}

pub fn simulate_zhvi(
    zip_codes: &[String],
    cities: impl Fn(&str) -> String,
    months: usize,
    end: NaiveDate,
    seed: u64,
) -> Result<SimulatedTable, AppError> {
    if months == 0 {
        return Err(AppError::usage("Simulated series needs at least one month."));
    }
    let dates = month_ends(end, months)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut headers: Vec<String> = LEADING_COLUMNS.iter().map(|s| s.to_string()).collect();
    headers.extend(dates.iter().map(|d| d.format("%Y-%m-%d").to_string()));

    let mut rows = Vec::with_capacity(zip_codes.len());
    for (rank, zip) in zip_codes.iter().enumerate() {
        let mut row = vec![
            format!("9{zip}"),
            (rank + 1).to_string(),
            zip.clone(),
            "zip".to_string(),
            "GA".to_string(),
            cities(zip),
        ];
        let mut value = BASE_VALUE;
        for _ in 0..months {
            value *= 1.0 + rng.gen_range(STEP_MIN..STEP_MAX);
            row.push(format!("{value:.2}"));
        }
        rows.push(row);
    }

    Ok(SimulatedTable { headers, rows })
}

pub fn write_simulated_csv(path: &Path, table: &SimulatedTable) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(&table.headers)
        .map_err(|e| AppError::io(format!("Failed to write CSV header: {e}")))?;
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::io(format!("Failed to write CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zips() -> Vec<String> {
        vec!["31088".to_string(), "31093".to_string()]
    }

    #[test]
    fn month_ends_roll_over_year_boundary() {
        let end = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let dates = month_ends(end, 3).unwrap();
        let labels: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
        assert_eq!(labels, vec!["2023-12-31", "2024-01-31", "2024-02-29"]);
    }

    #[test]
    fn same_seed_same_table() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let a = simulate_zhvi(&zips(), |_| "X".to_string(), 12, end, 7).unwrap();
        let b = simulate_zhvi(&zips(), |_| "X".to_string(), 12, end, 7).unwrap();
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.headers.len(), LEADING_COLUMNS.len() + 12);
        assert_eq!(a.rows[1][2], "31093");
    }

    #[test]
    fn walk_stays_within_step_bounds() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let table = simulate_zhvi(&zips(), |_| "X".to_string(), 6, end, 11).unwrap();
        for row in &table.rows {
            let values: Vec<f64> = row[LEADING_COLUMNS.len()..]
                .iter()
                .map(|v| v.parse().unwrap())
                .collect();
            let mut prev = BASE_VALUE;
            for v in values {
                let step = v / prev - 1.0;
                assert!(step >= STEP_MIN - 1e-6 && step < STEP_MAX + 1e-6, "step {step}");
                prev = v;
            }
        }
    }
}
