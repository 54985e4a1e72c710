//! CSV ingest: locate the ZHVI table and pull out the rows for the requested ZIPs.
//!
//! The table is wide (one column per month) and large, so all requested ZIPs
//! are collected in a single pass. Rows that fail to parse are skipped and
//! counted; they never abort the run.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::AppError;

/// Identifier columns, in order of preference.
const REGION_COLUMNS: [&str; 2] = ["RegionName", "region"];

/// One matching row as ordered `(header, cell)` pairs.
#[derive(Debug, Clone)]
pub struct RegionRow {
    pub region: String,
    /// 1-based line number in the CSV (header is line 1).
    pub line: usize,
    pub cells: Vec<(String, String)>,
}

/// Ingest summary for a lookup pass.
#[derive(Debug, Clone, Default)]
pub struct RegionLookup {
    pub rows: HashMap<String, RegionRow>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// First candidate path that exists.
pub fn locate_csv(candidates: &[PathBuf]) -> Option<PathBuf> {
    let found = candidates.iter().find(|p| p.is_file()).cloned();
    match &found {
        Some(path) => log::info!("Found CSV at: {}", path.display()),
        None => log::warn!("ZHVI CSV not found in any of {} candidate locations", candidates.len()),
    }
    found
}

/// Collect the first row for each of `zips` from the CSV at `path`.
pub fn find_region_rows(path: &Path, zips: &[String]) -> Result<RegionLookup, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::data(format!("Failed to open CSV '{}': {e}", path.display())))?;
    find_region_rows_in(file, zips)
}

/// Same as `find_region_rows`, over any reader.
pub fn find_region_rows_in<R: Read>(reader: R, zips: &[String]) -> Result<RegionLookup, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::data(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let region_idx = resolve_region_column(&headers)?;

    let mut lookup = RegionLookup::default();
    let mut record = StringRecord::new();
    let mut line = 1usize;

    loop {
        line += 1;
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                lookup.rows_read += 1;
                lookup.rows_skipped += 1;
                log::debug!("Skipping CSV line {line}: {e}");
                continue;
            }
        }
        lookup.rows_read += 1;

        let Some(region) = record.get(region_idx) else {
            lookup.rows_skipped += 1;
            continue;
        };
        let Some(zip) = zips.iter().find(|z| same_zip(region, z)) else {
            continue;
        };
        if lookup.rows.contains_key(zip) {
            continue;
        }

        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        lookup.rows.insert(
            zip.clone(),
            RegionRow {
                region: region.to_string(),
                line,
                cells,
            },
        );
        if lookup.rows.len() == zips.len() {
            break;
        }
    }

    Ok(lookup)
}

fn resolve_region_column(headers: &[String]) -> Result<usize, AppError> {
    for name in REGION_COLUMNS {
        if let Some(idx) = headers.iter().position(|h| h == name) {
            return Ok(idx);
        }
    }
    for name in REGION_COLUMNS {
        if let Some(idx) = headers.iter().position(|h| h.eq_ignore_ascii_case(name)) {
            return Ok(idx);
        }
    }
    Err(AppError::data(
        "CSV has no region column (expected 'RegionName' or 'region').",
    ))
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Exact match, or equal numeric ZIPs once leading zeros are ignored
/// (the published table stores `02108` as `2108`).
fn same_zip(cell: &str, zip: &str) -> bool {
    if cell == zip {
        return true;
    }
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    numeric(cell) && numeric(zip) && cell.trim_start_matches('0') == zip.trim_start_matches('0')
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\u{feff}RegionID,SizeRank,RegionName,State,2024-01-31,2024-02-29,2024-03-31\n\
                         1,10,31093,GA,300000,301000,302000\n\
                         2,11,31088,GA,280000,,285000\n\
                         3,12,2108,MA,900000,901000,902000\n\
                         4,13,31088,GA,1,2,3\n";

    fn zips(list: &[&str]) -> Vec<String> {
        list.iter().map(|z| z.to_string()).collect()
    }

    #[test]
    fn collects_first_matching_row_per_zip() {
        let lookup = find_region_rows_in(TABLE.as_bytes(), &zips(&["31088", "31093"])).unwrap();
        assert_eq!(lookup.rows.len(), 2);

        let row = &lookup.rows["31088"];
        assert_eq!(row.line, 3);
        assert!(row.cells.contains(&("2024-03-31".to_string(), "285000".to_string())));
        assert!(row.cells.contains(&("2024-02-29".to_string(), String::new())));
        assert_eq!(row.cells[0].0, "RegionID");
    }

    #[test]
    fn leading_zeros_are_ignored_for_numeric_zips() {
        let lookup = find_region_rows_in(TABLE.as_bytes(), &zips(&["02108"])).unwrap();
        assert_eq!(lookup.rows["02108"].region, "2108");
    }

    #[test]
    fn lowercase_region_column_is_accepted() {
        let csv = "region,2024-01\n31088,100\n";
        let lookup = find_region_rows_in(csv.as_bytes(), &zips(&["31088"])).unwrap();
        assert!(lookup.rows.contains_key("31088"));
    }

    #[test]
    fn missing_region_column_is_a_data_error() {
        let csv = "zip,2024-01\n31088,100\n";
        let err = find_region_rows_in(csv.as_bytes(), &zips(&["31088"])).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn unknown_zip_yields_no_row() {
        let lookup = find_region_rows_in(TABLE.as_bytes(), &zips(&["99999"])).unwrap();
        assert!(lookup.rows.is_empty());
        assert_eq!(lookup.rows_read, 4);
    }
}
