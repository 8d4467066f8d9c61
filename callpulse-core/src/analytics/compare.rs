//! Period comparison
//!
//! Compares two buckets of the current series and classifies the change as an
//! improvement or a regression using the metric's own direction.

use serde::{Deserialize, Serialize};

use crate::period::Period;
use crate::types::{AggregatedBucket, Direction};

/// Result of comparing bucket A against bucket B.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Value of bucket A (0 if the label is not in the series)
    pub value_a: f64,
    /// Value of bucket B (0 if the label is not in the series)
    pub value_b: f64,
    /// `value_a - value_b`
    pub delta: f64,
    /// `delta / value_b * 100`, or 0 when `value_b` is 0
    pub percent_change: f64,
    /// Whether the change is good for this metric
    pub improved: bool,
}

impl ComparisonResult {
    /// Compute a comparison from two values.
    pub fn from_values(value_a: f64, value_b: f64, direction: Direction) -> Self {
        let delta = value_a - value_b;
        Self {
            value_a,
            value_b,
            delta,
            percent_change: Self::calc_percent(delta, value_b),
            improved: direction.is_improvement(delta),
        }
    }

    /// Percent change relative to `base`; 0 instead of infinity when `base` is 0.
    pub fn calc_percent(delta: f64, base: f64) -> f64 {
        if base == 0.0 {
            0.0
        } else {
            delta / base * 100.0
        }
    }

    /// Format delta for display (e.g., "+2.0" or "-15.0").
    pub fn format_delta(&self) -> String {
        if self.delta >= 0.0 {
            format!("+{:.1}", self.delta)
        } else {
            format!("{:.1}", self.delta)
        }
    }

    /// Format percent change for display (e.g., "+3.4%" or "-3.4%").
    pub fn format_percent(&self) -> String {
        if self.percent_change >= 0.0 {
            format!("+{:.1}%", self.percent_change)
        } else {
            format!("{:.1}%", self.percent_change)
        }
    }
}

/// A pair of bucket labels to compare: A is usually the newer period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodPair {
    pub period_a: String,
    pub period_b: String,
}

/// Default comparison pair for a chronologically sorted series.
///
/// Most recent bucket vs. the one before it; a single bucket is compared with
/// itself; an empty series has no default.
pub fn default_pair(buckets: &[AggregatedBucket]) -> Option<PeriodPair> {
    match buckets {
        [] => None,
        [only] => Some(PeriodPair {
            period_a: only.label.clone(),
            period_b: only.label.clone(),
        }),
        [.., previous, last] => Some(PeriodPair {
            period_a: last.label.clone(),
            period_b: previous.label.clone(),
        }),
    }
}

/// Look up a bucket value by label. Labels are matched in canonical form, so
/// `"2024-q2"` finds `"2024-Q2"`. Missing labels yield `None`.
pub fn bucket_value(buckets: &[AggregatedBucket], label: &str) -> Option<f64> {
    let canonical = Period::parse(label)
        .map(|p| p.to_string())
        .unwrap_or_else(|_| label.to_string());
    buckets
        .iter()
        .find(|b| b.label == canonical)
        .map(|b| b.value)
}

/// Compare bucket `label_a` against bucket `label_b`.
///
/// Labels not present in `buckets` (e.g. a stale selection from another
/// granularity) count as 0 rather than failing.
pub fn compare(
    buckets: &[AggregatedBucket],
    label_a: &str,
    label_b: &str,
    direction: Direction,
) -> ComparisonResult {
    let value_a = bucket_value(buckets, label_a).unwrap_or(0.0);
    let value_b = bucket_value(buckets, label_b).unwrap_or(0.0);
    ComparisonResult::from_values(value_a, value_b, direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(label: &str, value: f64) -> AggregatedBucket {
        AggregatedBucket {
            label: label.to_string(),
            value,
            sort_key: label.to_string(),
        }
    }

    #[test]
    fn test_lower_is_better_improvement() {
        let buckets = vec![bucket("2024-05", 440.0), bucket("2024-06", 425.0)];
        let result = compare(&buckets, "2024-06", "2024-05", Direction::Down);

        assert_eq!(result.value_a, 425.0);
        assert_eq!(result.value_b, 440.0);
        assert_eq!(result.delta, -15.0);
        assert!((result.percent_change - (-3.409)).abs() < 0.01);
        assert!(result.improved);
        assert_eq!(result.format_delta(), "-15.0");
        assert_eq!(result.format_percent(), "-3.4%");
    }

    #[test]
    fn test_missing_b_yields_zero_percent() {
        let buckets = vec![bucket("2024-06", 425.0)];
        let result = compare(&buckets, "2024-06", "2023-Q4", Direction::Up);

        assert_eq!(result.value_b, 0.0);
        assert_eq!(result.delta, 425.0);
        assert_eq!(result.percent_change, 0.0);
        assert!(result.percent_change.is_finite());
        assert!(result.improved);
    }

    #[test]
    fn test_missing_labels_do_not_fail() {
        let result = compare(&[], "nope", "2024", Direction::Down);
        assert_eq!(result, ComparisonResult::from_values(0.0, 0.0, Direction::Down));
        assert!(result.improved);
    }

    #[test]
    fn test_direction_flip_flips_improved() {
        for (a, b) in [(10.0, 8.0), (8.0, 10.0)] {
            let up = ComparisonResult::from_values(a, b, Direction::Up);
            let down = ComparisonResult::from_values(a, b, Direction::Down);
            assert_ne!(up.improved, down.improved);
            assert_eq!(up.improved, up.delta >= 0.0);
            assert_eq!(down.improved, down.delta <= 0.0);
        }

        let up = ComparisonResult::from_values(5.0, 5.0, Direction::Up);
        let down = ComparisonResult::from_values(5.0, 5.0, Direction::Down);
        assert!(up.improved && down.improved);
    }

    #[test]
    fn test_label_lookup_is_canonical() {
        let buckets = vec![bucket("2024-Q2", 3.0), bucket("2024-03", 7.0)];
        assert_eq!(bucket_value(&buckets, "2024-q2"), Some(3.0));
        assert_eq!(bucket_value(&buckets, "2024-3"), Some(7.0));
        assert_eq!(bucket_value(&buckets, "2024-Q3"), None);
    }

    #[test]
    fn test_default_pair() {
        assert_eq!(default_pair(&[]), None);

        let one = vec![bucket("2024-Q1", 1.0)];
        let pair = default_pair(&one).unwrap();
        assert_eq!(pair.period_a, "2024-Q1");
        assert_eq!(pair.period_b, "2024-Q1");
        let result = compare(&one, &pair.period_a, &pair.period_b, Direction::Up);
        assert_eq!(result.delta, 0.0);

        let many = vec![
            bucket("2024-01", 1.0),
            bucket("2024-02", 2.0),
            bucket("2024-03", 3.0),
        ];
        let pair = default_pair(&many).unwrap();
        assert_eq!(pair.period_a, "2024-03");
        assert_eq!(pair.period_b, "2024-02");
    }
}
