//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by the metrics core in-memory
//! - written to `market.json` / `dashboard.json`
//! - reloaded later by the insight and dashboard steps

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Market direction derived from the price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Heating,
    Cooling,
    /// Only produced by the placeholder market written when every fetch attempt fails.
    Neutral,
}

impl Trend {
    pub fn label(self) -> &'static str {
        match self {
            Trend::Heating => "heating",
            Trend::Cooling => "cooling",
            Trend::Neutral => "neutral",
        }
    }

    pub fn is_cooling(self) -> bool {
        self == Trend::Cooling
    }
}

/// Which side of the market holds negotiating leverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leverage {
    Buyer,
    Seller,
    Balanced,
}

impl Leverage {
    pub fn label(self) -> &'static str {
        match self {
            Leverage::Buyer => "buyer",
            Leverage::Seller => "seller",
            Leverage::Balanced => "balanced",
        }
    }
}

/// Sampling period of the source series. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Monthly,
    Weekly,
}

/// Percent change between the two most recent values and the resulting direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReading {
    pub latest: f64,
    pub previous: f64,
    /// Signed percentage, rounded to 2 decimals.
    pub change_pct: f64,
    pub trend: Trend,
}

/// Secondary indicators derived from a `TrendReading`.
///
/// These are heuristic stand-ins rather than measured listing data; the only
/// contract is reproducibility for a given `(trend, change_pct, latest)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub inventory_proxy: u32,
    pub inventory_change_pct: f64,
    pub median_sale: u64,
    pub spread_pct: f64,
    pub avg_days_on_market: u32,
    pub dom_change: i32,
    pub absorption_rate: f64,
    pub months_supply: f64,
    pub seller_leverage: Leverage,
    pub price_reductions_up: bool,
    pub inventory_rising: bool,
}

/// The assembled per-ZIP market record.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub identifier: String,
    pub observed_at: NaiveDate,
    pub granularity: Granularity,
    pub latest_value: f64,
    pub previous_value: f64,
    pub trend: Trend,
    pub change_pct: f64,
    pub derived: DerivedMetrics,
    /// Tail series the reading was computed from (most recent last).
    pub history: Vec<f64>,
    /// True when the extracted series was too short and the fallback series was used.
    pub used_fallback: bool,
}

/// Tone tag attached to an insight line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightTone {
    Positive,
    Neutral,
    Negative,
}

impl InsightTone {
    pub fn label(self) -> &'static str {
        match self {
            InsightTone::Positive => "positive",
            InsightTone::Neutral => "neutral",
            InsightTone::Negative => "negative",
        }
    }
}

/// One human-readable note in `weekly_insights`.
///
/// Older files store plain strings; those load with a neutral tone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InsightRepr")]
pub struct Insight {
    pub text: String,
    #[serde(rename = "type")]
    pub tone: InsightTone,
}

impl Insight {
    pub fn new(tone: InsightTone, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InsightRepr {
    Tagged {
        text: String,
        #[serde(rename = "type")]
        tone: InsightTone,
    },
    Plain(String),
}

impl From<InsightRepr> for Insight {
    fn from(value: InsightRepr) -> Self {
        match value {
            InsightRepr::Tagged { text, tone } => Insight { text, tone },
            InsightRepr::Plain(text) => Insight {
                text,
                tone: InsightTone::Neutral,
            },
        }
    }
}

/// Static description of the market being tracked.
#[derive(Debug, Clone)]
pub struct MarketProfile {
    pub market_name: String,
    pub default_zip: String,
    /// ZIP → city lookup.
    pub cities: Vec<(String, String)>,
    pub default_city: String,
    pub granularity: Granularity,
    /// How many trailing periods feed the snapshot.
    pub history_len: usize,
    /// Substituted when fewer than 2 numeric values are available.
    pub fallback_series: Vec<f64>,
}

impl MarketProfile {
    pub fn city_for(&self, zip: &str) -> &str {
        self.cities
            .iter()
            .find(|(z, _)| z == zip)
            .map(|(_, city)| city.as_str())
            .unwrap_or(&self.default_city)
    }

    pub fn zip_codes(&self) -> Vec<String> {
        self.cities.iter().map(|(z, _)| z.clone()).collect()
    }
}

impl Default for MarketProfile {
    fn default() -> Self {
        Self {
            market_name: "Houston County, GA".to_string(),
            default_zip: "31088".to_string(),
            cities: vec![
                ("31088".to_string(), "Warner Robins".to_string()),
                ("31093".to_string(), "Centerville".to_string()),
                ("31098".to_string(), "Bonaire".to_string()),
            ],
            default_city: "Warner Robins".to_string(),
            granularity: Granularity::Monthly,
            history_len: crate::metrics::DEFAULT_TAIL,
            fallback_series: vec![280_000.0, 282_000.0, 285_000.0, 289_500.0],
        }
    }
}

/// Bounded retry with a fixed sleep between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub profile: MarketProfile,
    pub retry: RetryPolicy,
    pub source_url: String,

    /// Root of the per-ZIP output tree (`<root>/<zip>/processed/market.json`).
    pub data_root: PathBuf,
    /// Where a freshly downloaded CSV is stored.
    pub csv_cache: PathBuf,
    /// Candidate CSV locations, first existing wins.
    pub csv_candidates: Vec<PathBuf>,

    pub zip_codes: Vec<String>,
    pub skip_fetch: bool,
    /// Generate a synthetic CSV with this seed instead of downloading.
    pub offline_seed: Option<u64>,
    /// Chat-completion key; `None` keeps advisory output on canned text.
    pub advisor_key: Option<String>,
    pub advise_timeout: Duration,
    pub print_summary: bool,
}

/// `inventory` block of `market.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryBlock {
    pub active: u32,
    pub change_pct: f64,
}

/// `pricing` block of `market.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingBlock {
    pub median_list: u64,
    pub median_sale: u64,
    pub spread_pct: f64,
    pub trend: Trend,
}

/// `velocity` block of `market.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityBlock {
    pub avg_dom: u32,
    pub dom_change: i32,
    pub absorption_rate: f64,
    pub months_supply: f64,
}

/// `signals` block of `market.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalsBlock {
    pub seller_leverage: Leverage,
    pub price_reductions_up: bool,
    pub inventory_rising: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBlock {
    pub median_list: Vec<f64>,
}

/// The on-disk `market.json` document consumed by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketFile {
    pub market: String,
    pub zip: String,
    pub city: String,
    pub updated: NaiveDate,
    pub period: Granularity,
    pub inventory: InventoryBlock,
    pub pricing: PricingBlock,
    pub velocity: VelocityBlock,
    pub signals: SignalsBlock,
    pub history: HistoryBlock,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekly_insights: Vec<Insight>,
}

impl MarketFile {
    /// Flatten a snapshot into the dashboard schema.
    pub fn from_snapshot(snapshot: &MarketSnapshot, profile: &MarketProfile) -> Self {
        let d = &snapshot.derived;
        MarketFile {
            market: profile.market_name.clone(),
            zip: snapshot.identifier.clone(),
            city: profile.city_for(&snapshot.identifier).to_string(),
            updated: snapshot.observed_at,
            period: snapshot.granularity,
            inventory: InventoryBlock {
                active: d.inventory_proxy,
                change_pct: d.inventory_change_pct,
            },
            pricing: PricingBlock {
                median_list: snapshot.latest_value.max(0.0).trunc() as u64,
                median_sale: d.median_sale,
                spread_pct: d.spread_pct,
                trend: snapshot.trend,
            },
            velocity: VelocityBlock {
                avg_dom: d.avg_days_on_market,
                dom_change: d.dom_change,
                absorption_rate: d.absorption_rate,
                months_supply: d.months_supply,
            },
            signals: SignalsBlock {
                seller_leverage: d.seller_leverage,
                price_reductions_up: d.price_reductions_up,
                inventory_rising: d.inventory_rising,
            },
            history: HistoryBlock {
                median_list: snapshot.history.clone(),
            },
            weekly_insights: Vec::new(),
        }
    }

    /// Stand-in market written when the source could not be fetched at all.
    pub fn placeholder(zip: &str, profile: &MarketProfile, updated: NaiveDate) -> Self {
        MarketFile {
            market: profile.market_name.clone(),
            zip: zip.to_string(),
            city: profile.city_for(zip).to_string(),
            updated,
            period: profile.granularity,
            inventory: InventoryBlock {
                active: 100,
                change_pct: 0.0,
            },
            pricing: PricingBlock {
                median_list: 285_000,
                median_sale: 276_000,
                spread_pct: -3.0,
                trend: Trend::Neutral,
            },
            velocity: VelocityBlock {
                avg_dom: 30,
                dom_change: 0,
                absorption_rate: 1.0,
                months_supply: 3.0,
            },
            signals: SignalsBlock {
                seller_leverage: Leverage::Balanced,
                price_reductions_up: false,
                inventory_rising: false,
            },
            history: HistoryBlock {
                median_list: vec![280_000.0, 282_000.0, 285_000.0, 285_000.0],
            },
            weekly_insights: vec![
                Insight::new(
                    InsightTone::Neutral,
                    "Market data temporarily unavailable. Using cached data.",
                ),
                Insight::new(InsightTone::Neutral, "Check back soon for updated market insights."),
            ],
        }
    }

    /// Price change recomputed from the last two history values.
    pub fn price_change_pct(&self) -> Option<f64> {
        let values = &self.history.median_list;
        if values.len() < 2 {
            return None;
        }
        let latest = values[values.len() - 1];
        let previous = values[values.len() - 2];
        if previous == 0.0 {
            return None;
        }
        Some(crate::metrics::round_to((latest - previous) / previous * 100.0, 2))
    }
}
