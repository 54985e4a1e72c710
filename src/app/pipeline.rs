//! Pipeline steps shared by the individual subcommands and by `pulse run`.
//!
//! fetch -> locate CSV -> per-ZIP metrics + insights -> advise -> dashboard -> report
//!
//! Each step is a plain function over `PipelineConfig` so the front-end only
//! decides what to print.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Local, NaiveDate};

use crate::data::{ZillowClient, simulate_zhvi, write_simulated_csv};
use crate::domain::{MarketFile, PipelineConfig};
use crate::error::AppError;
use crate::insights::{
    ADVISOR_FILE_NAME, AdvisorClient, InsightThresholds, annotate, with_insights,
};
use crate::io::{
    DashboardFile, PipelineStatus, RegionLookup, ZipOutcome, ZipResult, build_dashboard,
    dashboard_path, find_region_rows, load_markets, locate_csv, market_path, read_market_json,
    write_dashboard_json, write_json_pretty, write_market_json, write_pipeline_report,
    write_status,
};
use crate::metrics::build_snapshot;

/// Months in a generated offline CSV.
pub const SIMULATED_MONTHS: usize = 12;

/// All outputs of a single `pulse run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub results: Vec<ZipResult>,
    pub dashboard: DashboardFile,
    pub advisor_path: PathBuf,
    pub report_path: PathBuf,
    pub status_path: PathBuf,
}

/// Download the source CSV into the cache location.
pub fn fetch_source(config: &PipelineConfig) -> Result<usize, AppError> {
    let client = ZillowClient::new(&config.source_url, config.retry.timeout)?;
    client.download_to(&config.csv_cache, &config.retry)
}

/// Write a seeded synthetic CSV into the cache location.
pub fn simulate_source(
    config: &PipelineConfig,
    seed: u64,
    end: NaiveDate,
) -> Result<PathBuf, AppError> {
    let profile = &config.profile;
    let table = simulate_zhvi(
        &config.zip_codes,
        |zip| profile.city_for(zip).to_string(),
        SIMULATED_MONTHS,
        end,
        seed,
    )?;
    write_simulated_csv(&config.csv_cache, &table)?;
    log::info!(
        "Simulated ZHVI CSV ({} ZIPs, seed {seed}) written to {}",
        config.zip_codes.len(),
        config.csv_cache.display()
    );
    Ok(config.csv_cache.clone())
}

/// Write the placeholder market for every configured ZIP.
pub fn write_placeholders(config: &PipelineConfig, today: NaiveDate) -> Vec<ZipResult> {
    config
        .zip_codes
        .iter()
        .map(|zip| {
            placeholder_result(config, zip, today, "source unavailable".to_string())
        })
        .collect()
}

fn placeholder_result(
    config: &PipelineConfig,
    zip: &str,
    today: NaiveDate,
    reason: String,
) -> ZipResult {
    let market = MarketFile::placeholder(zip, &config.profile, today);
    match write_market_json(&market_path(&config.data_root, zip), &market) {
        Ok(()) => {
            log::warn!("Placeholder market written for ZIP {zip} ({reason})");
            ZipResult {
                zip: zip.to_string(),
                outcome: ZipOutcome::Placeholder,
                detail: Some(reason),
            }
        }
        Err(e) => {
            log::error!("ZIP {zip}: {e}");
            ZipResult {
                zip: zip.to_string(),
                outcome: ZipOutcome::Failed,
                detail: Some(e.to_string()),
            }
        }
    }
}

/// Find the rows for `zips` in the first CSV that exists.
///
/// No CSV at all is not an error: the lookup is empty and every ZIP falls
/// back. An unreadable CSV is.
pub fn load_lookup(config: &PipelineConfig, zips: &[String]) -> Result<RegionLookup, AppError> {
    let Some(path) = locate_csv(&config.csv_candidates) else {
        return Ok(RegionLookup::default());
    };
    let lookup = find_region_rows(&path, zips)?;
    log::info!(
        "Scanned {} rows ({} skipped), matched {}/{} ZIPs",
        lookup.rows_read,
        lookup.rows_skipped,
        lookup.rows.len(),
        zips.len()
    );
    Ok(lookup)
}

/// Compute the market for `zip` from its row (or the fallback series).
///
/// Returns the market and whether the fallback series was used.
pub fn build_market(
    config: &PipelineConfig,
    zip: &str,
    lookup: &RegionLookup,
    today: NaiveDate,
) -> Result<(MarketFile, bool), AppError> {
    let row = lookup.rows.get(zip);
    match row {
        Some(row) => log::debug!("ZIP {zip} matched region '{}' on line {}", row.region, row.line),
        None => log::warn!("No CSV row for ZIP {zip}"),
    }
    let snapshot = build_snapshot(
        zip,
        row.map(|r| r.cells.as_slice()),
        &config.profile,
        today,
    )?;
    let market = MarketFile::from_snapshot(&snapshot, &config.profile);
    Ok((market, snapshot.used_fallback))
}

pub fn write_market(config: &PipelineConfig, market: &MarketFile) -> Result<PathBuf, AppError> {
    let path = market_path(&config.data_root, &market.zip);
    write_market_json(&path, market)?;
    Ok(path)
}

/// Append the rule-based insights for `market`.
pub fn annotate_market(market: MarketFile) -> MarketFile {
    let insights = annotate(&market, &InsightThresholds::default());
    with_insights(market, insights)
}

/// Reload the market file for `zip`, annotate it and write it back.
pub fn annotate_zip(config: &PipelineConfig, zip: &str) -> Result<MarketFile, AppError> {
    let path = market_path(&config.data_root, zip);
    if !path.is_file() {
        return Err(AppError::data(format!(
            "No market file for ZIP {zip} at {} (run `pulse metrics {zip}` first).",
            path.display()
        )));
    }
    let market = annotate_market(read_market_json(&path)?);
    write_market_json(&path, &market)?;
    log::info!(
        "ZIP {zip}: {} weekly insights in {}",
        market.weekly_insights.len(),
        path.display()
    );
    Ok(market)
}

/// Metrics + insights for one ZIP. Never fails: errors become a placeholder
/// (or a `Failed` outcome when even that cannot be written).
pub fn process_zip(
    config: &PipelineConfig,
    zip: &str,
    lookup: &RegionLookup,
    today: NaiveDate,
) -> ZipResult {
    let computed = build_market(config, zip, lookup, today).and_then(|(market, fallback)| {
        write_market(config, &annotate_market(market))?;
        Ok(fallback)
    });

    match computed {
        Ok(false) => ZipResult {
            zip: zip.to_string(),
            outcome: ZipOutcome::Computed,
            detail: None,
        },
        Ok(true) => ZipResult {
            zip: zip.to_string(),
            outcome: ZipOutcome::FallbackSeries,
            detail: Some("not enough history in CSV".to_string()),
        },
        Err(e) => {
            log::error!("ZIP {zip}: {e}");
            placeholder_result(config, zip, today, e.to_string())
        }
    }
}

/// Write `ai_insights.json` for the markets on disk.
pub fn advise(config: &PipelineConfig, zips: &[String]) -> Result<PathBuf, AppError> {
    let markets = load_markets(&config.data_root, zips);
    let client = AdvisorClient::new(config.advisor_key.clone(), config.advise_timeout)?;
    if !client.has_remote() {
        log::info!("DEEPSEEK_API_KEY not set; advisory notes and tips use canned text");
    }
    let report = client.report(&markets);

    let path = config.data_root.join(ADVISOR_FILE_NAME);
    write_json_pretty(&path, &report)?;
    log::info!(
        "Advisory notes and daily tips for {} ZIPs written to {} ({})",
        report.market_insights.len(),
        path.display(),
        if client.has_remote() { "remote" } else { "canned" }
    );
    Ok(path)
}

/// Aggregate the market files on disk into `dashboard.json`.
pub fn dashboard(config: &PipelineConfig, zips: &[String]) -> Result<DashboardFile, AppError> {
    let markets = load_markets(&config.data_root, zips);
    if markets.is_empty() {
        return Err(AppError::data(format!(
            "No market files found under {}.",
            config.data_root.display()
        )));
    }
    let dashboard = build_dashboard(&markets, Local::now().to_rfc3339());
    write_dashboard_json(&dashboard_path(&config.data_root), &dashboard)?;
    Ok(dashboard)
}

/// Execute the full pipeline.
///
/// Per-ZIP failures are recorded in the results; only failures of the
/// cross-ZIP steps (advise, dashboard, report) are returned as errors.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput, AppError> {
    let started = Instant::now();
    let today = Local::now().date_naive();

    // 1) Source CSV.
    let fetched = if config.skip_fetch {
        log::info!("Skipping fetch; using CSV already on disk");
        true
    } else if let Some(seed) = config.offline_seed {
        simulate_source(config, seed, today)?;
        true
    } else {
        match fetch_source(config) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to fetch Zillow data: {e}");
                false
            }
        }
    };

    // 2) Per-ZIP metrics + insights. A failed download with no CSV left on
    //    disk keeps the placeholders.
    let results = if !fetched && locate_csv(&config.csv_candidates).is_none() {
        write_placeholders(config, today)
    } else {
        let lookup = match load_lookup(config, &config.zip_codes) {
            Ok(lookup) => lookup,
            Err(e) => {
                log::error!("{e}; every ZIP uses the fallback series");
                RegionLookup::default()
            }
        };
        config
            .zip_codes
            .iter()
            .map(|zip| process_zip(config, zip, &lookup, today))
            .collect()
    };

    // 3) Cross-ZIP outputs.
    let advisor_path = advise(config, &config.zip_codes)?;
    let dashboard = dashboard(config, &config.zip_codes)?;

    // 4) Report + status.
    let finished = Local::now();
    let report_path = write_pipeline_report(&config.data_root, &results, finished, started.elapsed())?;
    let status = PipelineStatus::from_results(&results, finished);
    let status_path = write_status(&config.data_root, &status)?;

    Ok(RunOutput {
        results,
        dashboard,
        advisor_path,
        report_path,
        status_path,
    })
}

/// Default CSV search order, relative to `base`.
pub fn default_csv_candidates(base: &Path) -> Vec<PathBuf> {
    vec![
        base.join("tmp").join("zillow_zhvi.csv"),
        base.join("zillow_zhvi.csv"),
        PathBuf::from("/tmp/houston_zhvi/zillow_zhvi.csv"),
    ]
}
