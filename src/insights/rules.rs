//! Threshold rules that turn a market file into weekly insight lines.

use crate::domain::{Insight, InsightTone, Leverage, MarketFile, Trend};

/// Fixed cut-offs for the weekly insight rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsightThresholds {
    /// `inventory.change_pct` above this reads as a notable inventory increase.
    pub inventory_up_pct: f64,
    /// `inventory.change_pct` below this reads as tightening inventory.
    pub inventory_down_pct: f64,
    /// `velocity.dom_change` above this reads as slowing sales.
    pub dom_slowing_days: i32,
    /// `velocity.dom_change` below this reads as quickening sales.
    pub dom_quickening_days: i32,
    /// `pricing.spread_pct` below this reads as selling under list.
    pub below_list_spread_pct: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            inventory_up_pct: 3.0,
            inventory_down_pct: -3.0,
            dom_slowing_days: 2,
            dom_quickening_days: -2,
            below_list_spread_pct: -2.0,
        }
    }
}

/// Evaluate every rule against `market`, in a stable order.
pub fn annotate(market: &MarketFile, limits: &InsightThresholds) -> Vec<Insight> {
    let mut out = Vec::new();

    match market.pricing.trend {
        Trend::Heating => out.push(Insight::new(
            InsightTone::Positive,
            "Market is heating up with increased buyer activity.",
        )),
        Trend::Cooling => out.push(Insight::new(
            InsightTone::Neutral,
            "Market is cooling; buyers are gaining negotiating room.",
        )),
        Trend::Neutral => {}
    }

    let inventory = market.inventory.change_pct;
    if inventory > limits.inventory_up_pct {
        out.push(Insight::new(
            InsightTone::Neutral,
            "Inventory increased notably this week, giving buyers more options.",
        ));
    } else if inventory < limits.inventory_down_pct {
        out.push(Insight::new(
            InsightTone::Positive,
            "Inventory tightened this week, limiting buyer choices.",
        ));
    }

    let dom = market.velocity.dom_change;
    if dom > limits.dom_slowing_days {
        out.push(Insight::new(
            InsightTone::Negative,
            "Homes are taking longer to sell, suggesting pricing sensitivity.",
        ));
    } else if dom < limits.dom_quickening_days {
        out.push(Insight::new(
            InsightTone::Positive,
            "Homes are selling faster than last period, signaling strong demand.",
        ));
    }

    if market.pricing.spread_pct < limits.below_list_spread_pct {
        out.push(Insight::new(
            InsightTone::Neutral,
            "Homes are selling below list price on average.",
        ));
    }

    let signals = &market.signals;
    if signals.price_reductions_up {
        out.push(Insight::new(
            InsightTone::Negative,
            "Price reductions are becoming more common.",
        ));
    }
    if signals.inventory_rising {
        out.push(Insight::new(
            InsightTone::Neutral,
            "Active listings are rising; expect more competition between sellers.",
        ));
    }
    match signals.seller_leverage {
        Leverage::Seller => out.push(Insight::new(
            InsightTone::Positive,
            "Inventory remains tight, favoring sellers.",
        )),
        Leverage::Buyer => out.push(Insight::new(
            InsightTone::Neutral,
            "Buyers hold leverage; consider pricing competitively to attract offers.",
        )),
        Leverage::Balanced => {}
    }

    out
}

/// Return `market` with `insights` appended to `weekly_insights`.
///
/// Lines already present (same text) are not repeated, so annotating twice is a no-op.
pub fn with_insights(mut market: MarketFile, insights: Vec<Insight>) -> MarketFile {
    for insight in insights {
        if !market.weekly_insights.iter().any(|i| i.text == insight.text) {
            market.weekly_insights.push(insight);
        }
    }
    market
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketProfile;
    use crate::metrics::build_snapshot;
    use chrono::NaiveDate;

    fn market_from(values: &[(&str, &str)]) -> MarketFile {
        let cells: Vec<(String, String)> = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let profile = MarketProfile::default();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let snap = build_snapshot("31088", Some(&cells), &profile, day).unwrap();
        MarketFile::from_snapshot(&snap, &profile)
    }

    fn texts(insights: &[Insight]) -> Vec<&str> {
        insights.iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn cooling_market_flags_inventory_and_dom() {
        let market = market_from(&[("2024-03", "110"), ("2024-04", "100")]);
        let notes = annotate(&market, &InsightThresholds::default());
        let t = texts(&notes);
        assert!(t.contains(&"Inventory increased notably this week, giving buyers more options."));
        assert!(t.contains(&"Homes are taking longer to sell, suggesting pricing sensitivity."));
        assert!(t.contains(&"Homes are selling below list price on average."));
        assert!(t.contains(&"Price reductions are becoming more common."));
    }

    #[test]
    fn mild_heating_market_has_no_threshold_notes() {
        let market = market_from(&[("2024-03", "285000"), ("2024-04", "289500")]);
        let notes = annotate(&market, &InsightThresholds::default());
        let t = texts(&notes);
        // inventory change -1.6 and dom change -2 sit inside the bands.
        assert!(!t.iter().any(|s| s.starts_with("Inventory increased")));
        assert!(!t.iter().any(|s| s.starts_with("Inventory tightened")));
        assert!(!t.iter().any(|s| s.starts_with("Homes are selling faster")));
        assert_eq!(t[0], "Market is heating up with increased buyer activity.");
    }

    #[test]
    fn strong_heating_market_flags_tight_inventory() {
        let market = market_from(&[("2024-03", "100000"), ("2024-04", "105000")]);
        let t: Vec<String> = annotate(&market, &InsightThresholds::default())
            .into_iter()
            .map(|i| i.text)
            .collect();
        assert!(t.iter().any(|s| s.starts_with("Inventory tightened")));
    }

    #[test]
    fn annotation_leaves_numbers_alone_and_is_idempotent() {
        let market = market_from(&[("2024-03", "110"), ("2024-04", "100")]);
        let notes = annotate(&market, &InsightThresholds::default());
        let once = with_insights(market.clone(), notes.clone());
        let twice = with_insights(once.clone(), notes);

        assert_eq!(once, twice);
        assert_eq!(once.inventory, market.inventory);
        assert_eq!(once.pricing, market.pricing);
        assert_eq!(once.velocity, market.velocity);
    }
}
