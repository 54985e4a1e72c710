//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the metrics code stays free of presentation
//! - output changes are localized

use crate::domain::{Insight, MarketFile};
use crate::io::dashboard::DashboardFile;
use crate::io::status::ZipResult;

/// Format one market as a short block of text.
pub fn format_market_summary(market: &MarketFile) -> String {
    let mut out = String::new();

    out.push_str("=== pulse - Market Snapshot ===\n");
    out.push_str(&format!(
        "Market: {} | ZIP {} ({})\n",
        market.market, market.zip, market.city
    ));
    out.push_str(&format!(
        "Updated: {} ({:?})\n",
        market.updated, market.period
    ));

    let change = market
        .price_change_pct()
        .map(|c| format!("{c:+.2}%"))
        .unwrap_or_else(|| "n/a".to_string());
    out.push_str(&format!(
        "Pricing: list ${} | sale ${} | spread {:.1}% | trend {} ({change})\n",
        fmt_thousands(market.pricing.median_list),
        fmt_thousands(market.pricing.median_sale),
        market.pricing.spread_pct,
        market.pricing.trend.label(),
    ));
    out.push_str(&format!(
        "Inventory: {} active ({:+.1}%)\n",
        market.inventory.active, market.inventory.change_pct
    ));
    out.push_str(&format!(
        "Velocity: {} DOM ({:+}) | absorption {:.2} | supply {:.1} months\n",
        market.velocity.avg_dom,
        market.velocity.dom_change,
        market.velocity.absorption_rate,
        market.velocity.months_supply,
    ));
    out.push_str(&format!(
        "Signals: {} leverage | reductions up: {} | inventory rising: {}\n",
        market.signals.seller_leverage.label(),
        yes_no(market.signals.price_reductions_up),
        yes_no(market.signals.inventory_rising),
    ));
    out.push_str(&format!(
        "History: {}\n",
        market
            .history
            .median_list
            .iter()
            .map(|v| format!("{v:.0}"))
            .collect::<Vec<_>>()
            .join(" -> ")
    ));

    if !market.weekly_insights.is_empty() {
        out.push_str("\nWeekly insights:\n");
        out.push_str(&format_insights(&market.weekly_insights));
    }

    out
}

pub fn format_insights(insights: &[Insight]) -> String {
    let mut out = String::new();
    for insight in insights {
        out.push_str(&format!("- [{}] {}\n", insight.tone.label(), insight.text));
    }
    out
}

/// Per-ZIP outcomes of a pipeline run.
pub fn format_run_results(results: &[ZipResult]) -> String {
    let mut out = String::new();
    out.push_str("ZIP    | Outcome         | Detail\n");
    out.push_str("-------+-----------------+---------------------------\n");
    for r in results {
        out.push_str(&format!(
            "{:<6} | {:<15} | {}\n",
            r.zip,
            r.outcome.label(),
            r.detail.as_deref().unwrap_or("")
        ));
    }
    out
}

pub fn format_dashboard(dashboard: &DashboardFile) -> String {
    let mut out = String::new();
    let s = &dashboard.market_summary;
    out.push_str(&format!(
        "Dashboard: {} ZIPs | avg price ${} | inventory {} | trend {} ({} heating / {} cooling)\n",
        dashboard.zip_codes.len(),
        fmt_thousands(s.avg_price),
        s.total_inventory,
        s.market_trend.label(),
        s.heating_count,
        s.cooling_count,
    ));
    if let Some(zip) = &s.strongest_zip {
        out.push_str(&format!("Strongest price momentum: {zip}\n"));
    }
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// `1234567` -> `1,234,567`
pub fn fmt_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InsightTone, MarketProfile};
    use chrono::NaiveDate;

    #[test]
    fn thousands_separator() {
        assert_eq!(fmt_thousands(0), "0");
        assert_eq!(fmt_thousands(999), "999");
        assert_eq!(fmt_thousands(289_500), "289,500");
        assert_eq!(fmt_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn summary_mentions_core_figures() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let market = MarketFile::placeholder("31093", &MarketProfile::default(), day);
        let text = format_market_summary(&market);
        assert!(text.contains("ZIP 31093 (Centerville)"));
        assert!(text.contains("list $285,000"));
        assert!(text.contains("trend neutral (+0.00%)"));
        assert!(text.contains("280000 -> 282000 -> 285000 -> 285000"));
        assert!(text.contains("- [neutral] Market data temporarily unavailable."));
    }

    #[test]
    fn insight_lines_keep_text_case() {
        let lines = format_insights(&[Insight::new(InsightTone::Positive, "Inventory remains tight")]);
        assert_eq!(lines, "- [positive] Inventory remains tight\n");
    }
}
