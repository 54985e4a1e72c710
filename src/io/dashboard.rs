//! Cross-ZIP dashboard aggregation.
//!
//! Reads per-ZIP market files and condenses them into `dashboard.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{Leverage, MarketFile, Trend};
use crate::error::AppError;
use crate::io::market::{market_path, read_market_json, write_json_pretty};

pub const DASHBOARD_FILE_NAME: &str = "dashboard.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipSummary {
    pub zip: String,
    pub city: String,
    pub median_list: u64,
    pub trend: Trend,
    pub price_change_pct: Option<f64>,
    pub active_listings: u32,
    pub avg_dom: u32,
    pub seller_leverage: Leverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub avg_price: u64,
    pub total_inventory: u64,
    pub heating_count: usize,
    pub cooling_count: usize,
    pub market_trend: Trend,
    pub strongest_zip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardFile {
    pub last_updated: String,
    pub zip_codes: Vec<ZipSummary>,
    pub market_summary: MarketSummary,
}

pub fn dashboard_path(root: &Path) -> PathBuf {
    root.join(DASHBOARD_FILE_NAME)
}

/// Load every available market file; missing or unreadable ones are skipped.
pub fn load_markets(root: &Path, zips: &[String]) -> Vec<MarketFile> {
    let mut out = Vec::with_capacity(zips.len());
    for zip in zips {
        let path = market_path(root, zip);
        if !path.is_file() {
            log::warn!("No market file for ZIP {zip} at {}", path.display());
            continue;
        }
        match read_market_json(&path) {
            Ok(market) => out.push(market),
            Err(e) => log::warn!("Skipping ZIP {zip}: {e}"),
        }
    }
    out
}

pub fn summarize_zip(market: &MarketFile) -> ZipSummary {
    ZipSummary {
        zip: market.zip.clone(),
        city: market.city.clone(),
        median_list: market.pricing.median_list,
        trend: market.pricing.trend,
        price_change_pct: market.price_change_pct(),
        active_listings: market.inventory.active,
        avg_dom: market.velocity.avg_dom,
        seller_leverage: market.signals.seller_leverage,
    }
}

pub fn summarize_market(zips: &[ZipSummary]) -> MarketSummary {
    let n = zips.len() as u64;
    let avg_price = if n == 0 {
        0
    } else {
        zips.iter().map(|z| z.median_list).sum::<u64>() / n
    };
    let total_inventory = zips.iter().map(|z| u64::from(z.active_listings)).sum();
    let heating_count = zips.iter().filter(|z| z.trend == Trend::Heating).count();
    let cooling_count = zips.iter().filter(|z| z.trend == Trend::Cooling).count();

    let market_trend = match heating_count.cmp(&cooling_count) {
        std::cmp::Ordering::Greater => Trend::Heating,
        std::cmp::Ordering::Less => Trend::Cooling,
        std::cmp::Ordering::Equal => Trend::Neutral,
    };

    let strongest_zip = zips
        .iter()
        .filter_map(|z| z.price_change_pct.map(|c| (c, &z.zip)))
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, zip)| zip.clone());

    MarketSummary {
        avg_price,
        total_inventory,
        heating_count,
        cooling_count,
        market_trend,
        strongest_zip,
    }
}

pub fn build_dashboard(markets: &[MarketFile], last_updated: String) -> DashboardFile {
    let zip_codes: Vec<ZipSummary> = markets.iter().map(summarize_zip).collect();
    let market_summary = summarize_market(&zip_codes);
    DashboardFile {
        last_updated,
        zip_codes,
        market_summary,
    }
}

pub fn write_dashboard_json(path: &Path, dashboard: &DashboardFile) -> Result<(), AppError> {
    write_json_pretty(path, dashboard)?;
    log::info!(
        "Dashboard with {} ZIP codes written to {}",
        dashboard.zip_codes.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketProfile;
    use crate::metrics::build_snapshot;
    use chrono::NaiveDate;

    fn market(zip: &str, prev: &str, latest: &str) -> MarketFile {
        let cells = vec![
            ("2024-03".to_string(), prev.to_string()),
            ("2024-04".to_string(), latest.to_string()),
        ];
        let profile = MarketProfile::default();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let snap = build_snapshot(zip, Some(&cells), &profile, day).unwrap();
        MarketFile::from_snapshot(&snap, &profile)
    }

    #[test]
    fn summary_counts_and_majority_trend() {
        let markets = vec![
            market("31088", "285000", "289500"),
            market("31093", "300000", "306000"),
            market("31098", "110", "100"),
        ];
        let dash = build_dashboard(&markets, "2024-05-01T00:00:00".to_string());
        let s = &dash.market_summary;
        assert_eq!(s.heating_count, 2);
        assert_eq!(s.cooling_count, 1);
        assert_eq!(s.market_trend, Trend::Heating);
        assert_eq!(s.strongest_zip.as_deref(), Some("31093"));
        assert_eq!(s.avg_price, (289_500 + 306_000 + 100) / 3);
        assert_eq!(dash.zip_codes[0].price_change_pct, Some(1.58));
    }

    #[test]
    fn tie_is_neutral_and_empty_is_zero() {
        let markets = vec![market("31088", "100", "110"), market("31093", "110", "100")];
        let dash = build_dashboard(&markets, String::new());
        assert_eq!(dash.market_summary.market_trend, Trend::Neutral);

        let empty = summarize_market(&[]);
        assert_eq!(empty.avg_price, 0);
        assert_eq!(empty.strongest_zip, None);
    }
}
