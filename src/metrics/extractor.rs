//! Series extraction from a wide, date-labeled CSV row.

/// Default number of trailing periods kept for a snapshot.
pub const DEFAULT_TAIL: usize = 4;

/// Result of choosing the series a snapshot is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSeries {
    pub values: Vec<f64>,
    pub used_fallback: bool,
}

/// Loose period-label test: the label's first four characters (or all of
/// them, when shorter) are ASCII digits.
///
/// This accepts `2024-01-31`, `2024-01`, `202401`, `202` and rejects
/// `RegionName`, `SizeRank`, `State` and the empty label.
pub fn is_period_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    let head = &bytes[..bytes.len().min(4)];
    !head.is_empty() && head.iter().all(u8::is_ascii_digit)
}

/// Take the most recent `n` period columns of a row, oldest first.
///
/// Empty or unparseable cells are skipped, so the output can be shorter than `n`.
pub fn extract_tail(cells: &[(String, String)], n: usize) -> Vec<f64> {
    let mut periods: Vec<(&str, &str)> = cells
        .iter()
        .filter(|(label, _)| is_period_label(label))
        .map(|(label, value)| (label.as_str(), value.as_str()))
        .collect();
    periods.sort_by(|a, b| a.0.cmp(b.0));

    let start = periods.len().saturating_sub(n);
    periods[start..]
        .iter()
        .filter_map(|(_, raw)| parse_cell(raw))
        .collect()
}

/// Keep `values` when there are at least two, otherwise substitute `fallback`.
pub fn select_series(values: Vec<f64>, fallback: &[f64]) -> SelectedSeries {
    if values.len() >= 2 {
        SelectedSeries {
            values,
            used_fallback: false,
        }
    } else {
        SelectedSeries {
            values: fallback.to_vec(),
            used_fallback: true,
        }
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn keeps_last_periods_in_chronological_order() {
        let cells = row(&[
            ("RegionName", "31088"),
            ("2024-04-30", "289500"),
            ("2024-01-31", "280000"),
            ("SizeRank", "1200"),
            ("2023-12-31", "279000"),
            ("2024-03-31", "285000"),
            ("2024-02-29", "282000"),
        ]);
        let tail = extract_tail(&cells, 4);
        assert_eq!(tail, vec![280000.0, 282000.0, 285000.0, 289500.0]);
    }

    #[test]
    fn empty_cells_shorten_the_tail() {
        let cells = row(&[
            ("2024-01", "280000"),
            ("2024-02", ""),
            ("2024-03", "n/a"),
            ("2024-04", " 289500 "),
        ]);
        assert_eq!(extract_tail(&cells, 4), vec![280000.0, 289500.0]);
        // Only the last two columns are considered, and one of them is bad.
        assert_eq!(extract_tail(&cells, 2), vec![289500.0]);
    }

    #[test]
    fn period_label_checks_only_the_leading_digits() {
        assert!(is_period_label("2024-01-31"));
        assert!(is_period_label("202401"));
        assert!(is_period_label("202"));
        assert!(!is_period_label("20a4-01"));
        assert!(!is_period_label(""));
        assert!(!is_period_label("RegionName"));
    }

    #[test]
    fn fallback_used_below_two_values() {
        let fallback = [1.0, 2.0, 3.0];
        let picked = select_series(vec![5.0], &fallback);
        assert!(picked.used_fallback);
        assert_eq!(picked.values, fallback.to_vec());

        let picked = select_series(vec![5.0, 6.0], &fallback);
        assert!(!picked.used_fallback);
        assert_eq!(picked.values, vec![5.0, 6.0]);
    }
}
