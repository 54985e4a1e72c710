//! Read/write `market.json`.
//!
//! The file is the hand-off point to the dashboard. The schema is defined by
//! `domain::MarketFile`; it is fully overwritten on every run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::MarketFile;
use crate::error::AppError;

pub const MARKET_FILE_NAME: &str = "market.json";

/// `<root>/<zip>/processed/market.json`
pub fn market_path(root: &Path, zip: &str) -> PathBuf {
    root.join(zip).join("processed").join(MARKET_FILE_NAME)
}

pub fn write_market_json(path: &Path, market: &MarketFile) -> Result<(), AppError> {
    write_json_pretty(path, market)?;
    log::info!("Market metrics for ZIP {} written to {}", market.zip, path.display());
    Ok(())
}

pub fn read_market_json(path: &Path) -> Result<MarketFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::data(format!("Failed to open market JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file).map_err(|e| {
        AppError::data(format!("Invalid market JSON '{}': {e}", path.display()))
    })
}

/// Pretty-print `value` to `path`, creating parent directories.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}
