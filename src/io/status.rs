//! Pipeline run report and machine-readable status file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::AppError;
use crate::io::market::write_json_pretty;

pub const STATUS_FILE_NAME: &str = "pipeline_status.json";

/// How one ZIP's market file came to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZipOutcome {
    /// Computed from the ZIP's own CSV row.
    Computed,
    /// Computed from the fallback series (row missing or too sparse).
    FallbackSeries,
    /// Placeholder market written after a failure.
    Placeholder,
    /// Nothing could be written.
    Failed,
}

impl ZipOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ZipOutcome::Computed => "computed",
            ZipOutcome::FallbackSeries => "fallback series",
            ZipOutcome::Placeholder => "placeholder",
            ZipOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipResult {
    pub zip: String,
    pub outcome: ZipOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub last_run: String,
    pub status: String,
    pub version: String,
    pub zip_codes: Vec<ZipResult>,
    pub fallbacks: Vec<String>,
}

impl PipelineStatus {
    pub fn from_results(results: &[ZipResult], finished: DateTime<Local>) -> Self {
        let failed = results.iter().any(|r| r.outcome == ZipOutcome::Failed);
        let fallbacks = results
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    ZipOutcome::FallbackSeries | ZipOutcome::Placeholder
                )
            })
            .map(|r| r.zip.clone())
            .collect();
        Self {
            last_run: finished.to_rfc3339(),
            status: if failed { "degraded" } else { "success" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            zip_codes: results.to_vec(),
            fallbacks,
        }
    }
}

pub fn write_status(root: &Path, status: &PipelineStatus) -> Result<PathBuf, AppError> {
    let path = root.join(STATUS_FILE_NAME);
    write_json_pretty(&path, status)?;
    Ok(path)
}

/// All `.json` files under `dir`, sorted, with their sizes in bytes.
pub fn list_json_files(dir: &Path) -> Vec<(PathBuf, u64)> {
    let mut out = Vec::new();
    collect_json(dir, &mut out);
    out.sort();
    out
}

fn collect_json(dir: &Path, out: &mut Vec<(PathBuf, u64)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_json(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            out.push((path, size));
        }
    }
}

/// Write `<root>/reports/pipeline_report_<ts>.txt`.
pub fn write_pipeline_report(
    root: &Path,
    results: &[ZipResult],
    finished: DateTime<Local>,
    elapsed: Duration,
) -> Result<PathBuf, AppError> {
    let dir = root.join("reports");
    fs::create_dir_all(&dir)
        .map_err(|e| AppError::io(format!("Failed to create report dir: {e}")))?;

    let path = dir.join(format!(
        "pipeline_report_{}.txt",
        finished.format("%Y%m%d_%H%M%S")
    ));
    let mut file = File::create(&path)
        .map_err(|e| AppError::io(format!("Failed to create report file: {e}")))?;

    let rule = "=".repeat(60);
    let mut text = String::new();
    text.push_str(&format!("{rule}\nREAL ESTATE DATA PIPELINE REPORT\n{rule}\n\n"));
    text.push_str(&format!(
        "Generated: {}\n",
        finished.format("%Y-%m-%d %H:%M:%S")
    ));
    text.push_str(&format!("Elapsed: {:.1}s\n\n", elapsed.as_secs_f64()));

    text.push_str("ZIP CODES:\n");
    text.push_str(&format!("{}\n", "-".repeat(40)));
    for r in results {
        match &r.detail {
            Some(detail) => text.push_str(&format!("  {} {} ({detail})\n", r.zip, r.outcome.label())),
            None => text.push_str(&format!("  {} {}\n", r.zip, r.outcome.label())),
        }
    }

    text.push_str("\nGENERATED FILES:\n");
    text.push_str(&format!("{}\n", "-".repeat(40)));
    let base = root.parent().unwrap_or(root);
    for (json, size) in list_json_files(root) {
        let shown = json.strip_prefix(base).unwrap_or(&json);
        text.push_str(&format!(
            "  {} ({:.1} KB)\n",
            shown.display(),
            size as f64 / 1024.0
        ));
    }

    file.write_all(text.as_bytes())
        .map_err(|e| AppError::io(format!("Failed to write report file: {e}")))?;
    log::info!("Pipeline report written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(zip: &str, outcome: ZipOutcome) -> ZipResult {
        ZipResult {
            zip: zip.to_string(),
            outcome,
            detail: None,
        }
    }

    #[test]
    fn status_lists_fallbacks_and_degrades_on_failure() {
        let results = vec![
            result("31088", ZipOutcome::Computed),
            result("31093", ZipOutcome::FallbackSeries),
            result("31098", ZipOutcome::Placeholder),
        ];
        let status = PipelineStatus::from_results(&results, Local::now());
        assert_eq!(status.status, "success");
        assert_eq!(status.fallbacks, vec!["31093", "31098"]);

        let mut with_failure = results.clone();
        with_failure.push(result("31099", ZipOutcome::Failed));
        let status = PipelineStatus::from_results(&with_failure, Local::now());
        assert_eq!(status.status, "degraded");
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let v = serde_json::to_value(result("31093", ZipOutcome::FallbackSeries)).unwrap();
        assert_eq!(v["outcome"], "fallback_series");
        assert!(v.get("detail").is_none());
    }
}
