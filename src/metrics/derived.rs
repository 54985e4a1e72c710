//! Heuristic secondary indicators.
//!
//! Every value here is a fixed function of `(trend, change_pct, latest)`. The
//! constants stand in for listing data the pipeline does not have.

use crate::domain::{DerivedMetrics, Leverage, Trend};

use super::round_to;

/// Sale-to-list spread. Not computed from data.
pub const SPREAD_PCT_PLACEHOLDER: f64 = -3.0;
/// Median sale price as a fraction of the latest list value.
pub const SALE_TO_LIST_RATIO: f64 = 0.97;
/// Smallest absolute change used as the inventory-proxy divisor.
pub const MIN_CHANGE_MAGNITUDE: f64 = 0.1;
/// Numerator of the inventory proxy.
pub const INVENTORY_SCALE: f64 = 100.0;

/// Velocity figures for one side of the cooling/heating split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityProfile {
    pub avg_days_on_market: u32,
    pub dom_change: i32,
    pub absorption_rate: f64,
    pub months_supply: f64,
    pub leverage: Leverage,
}

pub const COOLING_VELOCITY: VelocityProfile = VelocityProfile {
    avg_days_on_market: 30,
    dom_change: 3,
    absorption_rate: 0.75,
    months_supply: 4.2,
    leverage: Leverage::Buyer,
};

pub const HEATING_VELOCITY: VelocityProfile = VelocityProfile {
    avg_days_on_market: 22,
    dom_change: -2,
    absorption_rate: 1.1,
    months_supply: 2.8,
    leverage: Leverage::Seller,
};

/// Inventory proxy: `max(1, floor(100 / max(|change_pct|, 0.1)))`.
pub fn inventory_proxy(change_pct: f64) -> u32 {
    if change_pct.is_nan() {
        return 1;
    }
    let divisor = change_pct.abs().max(MIN_CHANGE_MAGNITUDE);
    let proxy = (INVENTORY_SCALE / divisor).floor();
    if proxy.is_finite() && proxy >= 1.0 {
        proxy as u32
    } else {
        1
    }
}

/// Derive the secondary metrics block.
pub fn derive_metrics(trend: Trend, change_pct: f64, latest: f64) -> DerivedMetrics {
    let cooling = trend.is_cooling();
    let velocity = if cooling {
        COOLING_VELOCITY
    } else {
        HEATING_VELOCITY
    };

    DerivedMetrics {
        inventory_proxy: inventory_proxy(change_pct),
        // Inventory moves opposite to price momentum.
        inventory_change_pct: round_to(-change_pct, 1),
        median_sale: (latest * SALE_TO_LIST_RATIO).floor().max(0.0) as u64,
        spread_pct: SPREAD_PCT_PLACEHOLDER,
        avg_days_on_market: velocity.avg_days_on_market,
        dom_change: velocity.dom_change,
        absorption_rate: velocity.absorption_rate,
        months_supply: velocity.months_supply,
        seller_leverage: velocity.leverage,
        price_reductions_up: cooling,
        inventory_rising: cooling,
    }
}
