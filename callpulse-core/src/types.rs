//! Core domain types for callpulse
//!
//! These types describe the KPI data model the dashboard engine consumes.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Metric** | A tracked KPI (AHT, FCR, CSAT, ...) with static configuration |
//! | **Record** | One observed value of a metric for one period |
//! | **Granularity** | Calendar resolution: Month, Quarter, HalfYear, Year |
//! | **Bucket** | Aggregation unit at the display granularity |
//! | **Rollup** | Combining finer records into a coarser bucket, never the reverse |
//! | **Direction** | Whether higher (`up`) or lower (`down`) values are better |
//!
//! Metric definitions and records are owned by the admin side of the
//! application. The engine only ever reads them.

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ============================================
// Granularity
// ============================================

/// Calendar resolution of a period.
///
/// Variants are declared finest-first so the derived ordering doubles as the
/// rollup rule: a record may only be rolled into a granularity `>=` its own.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Month,
    Quarter,
    #[serde(alias = "halfyear", alias = "half-year")]
    HalfYear,
    Year,
}

impl Granularity {
    /// All granularities, finest first.
    pub const ALL: [Granularity; 4] = [
        Granularity::Month,
        Granularity::Quarter,
        Granularity::HalfYear,
        Granularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::HalfYear => "half_year",
            Granularity::Year => "year",
        }
    }

    /// Number of months a single period of this granularity spans.
    pub fn months(&self) -> u32 {
        match self {
            Granularity::Month => 1,
            Granularity::Quarter => 3,
            Granularity::HalfYear => 6,
            Granularity::Year => 12,
        }
    }

    /// Whether records at this granularity can be rolled into `target` buckets.
    pub fn rolls_into(&self, target: Granularity) -> bool {
        *self <= target
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" | "monthly" => Ok(Granularity::Month),
            "quarter" | "quarterly" => Ok(Granularity::Quarter),
            "half_year" | "halfyear" | "half-year" | "half" => Ok(Granularity::HalfYear),
            "year" | "yearly" | "annual" => Ok(Granularity::Year),
            other => Err(Error::InvalidGranularity(other.to_string())),
        }
    }
}

// ============================================
// Metric configuration
// ============================================

/// How values that land in the same bucket are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Avg,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
        }
    }
}

impl std::str::FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Aggregation::Sum),
            "avg" => Ok(Aggregation::Avg),
            other => Err(Error::InvalidAggregation(other.to_string())),
        }
    }
}

/// Which way is "better" for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Larger values are better (FCR, CSAT, service level)
    Up,
    /// Smaller values are better (AHT, abandonment rate)
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Classify a change as an improvement. A zero change always counts.
    pub fn is_improvement(&self, delta: f64) -> bool {
        match self {
            Direction::Up => delta >= 0.0,
            Direction::Down => delta <= 0.0,
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// Static configuration for one tracked KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Stable identifier (e.g., "aht")
    pub id: String,
    /// Display label
    pub label: String,
    /// Display unit (e.g., "sec", "%")
    pub unit: String,
    /// Target value, if the metric has one
    #[serde(default)]
    pub target: Option<f64>,
    /// Granularity shown when the metric is first selected
    pub default_granularity: Granularity,
    /// How same-bucket values combine
    pub aggregation: Aggregation,
    /// Whether higher or lower values are better
    pub direction: Direction,
}

impl MetricDefinition {
    /// Whether `value` meets this metric's target, if one is set.
    pub fn target_status(&self, value: f64) -> Option<TargetStatus> {
        self.target.map(|target| {
            if self.direction.is_improvement(value - target) {
                TargetStatus::Met
            } else {
                TargetStatus::Missed
            }
        })
    }
}

/// Comparison of a value against a metric's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    Met,
    Missed,
}

// ============================================
// Records
// ============================================

/// One observed value for a metric, as entered by an admin.
///
/// The period is kept as the raw string; it is parsed and validated on its
/// way into the rollup engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Period string: "YYYY-MM", "YYYY-QN", "YYYY-HN" or "YYYY"
    pub period: String,
    /// Observed value
    pub value: f64,
}

impl RawRecord {
    pub fn new(period: impl Into<String>, value: f64) -> Self {
        Self {
            period: period.into(),
            value,
        }
    }
}

/// One point of the displayed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBucket {
    /// Period label at the display granularity
    pub label: String,
    /// Aggregated value, rounded to one decimal
    pub value: f64,
    /// Fixed-width, lexicographically sortable key
    pub sort_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(direction: Direction, target: Option<f64>) -> MetricDefinition {
        MetricDefinition {
            id: "m".to_string(),
            label: "Metric".to_string(),
            unit: "%".to_string(),
            target,
            default_granularity: Granularity::Month,
            aggregation: Aggregation::Avg,
            direction,
        }
    }

    #[test]
    fn test_granularity_order_is_finest_first() {
        assert!(Granularity::Month < Granularity::Quarter);
        assert!(Granularity::Quarter < Granularity::HalfYear);
        assert!(Granularity::HalfYear < Granularity::Year);
        assert!(Granularity::Month.rolls_into(Granularity::Year));
        assert!(!Granularity::Year.rolls_into(Granularity::Quarter));
    }

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("Quarter".parse::<Granularity>().unwrap(), Granularity::Quarter);
        assert_eq!("half-year".parse::<Granularity>().unwrap(), Granularity::HalfYear);
        assert!("week".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_enum_parse_errors_share_error_type() {
        assert!(matches!(
            "median".parse::<Aggregation>(),
            Err(Error::InvalidAggregation(s)) if s == "median"
        ));
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(Error::InvalidDirection(s)) if s == "sideways"
        ));
        assert_eq!("avg".parse::<Aggregation>().unwrap(), Aggregation::Avg);
        assert_eq!("down".parse::<Direction>().unwrap(), Direction::Down);
    }

    #[test]
    fn test_granularity_serde_accepts_halfyear_spellings() {
        for spelling in ["\"half_year\"", "\"halfyear\"", "\"half-year\""] {
            let g: Granularity = serde_json::from_str(spelling).unwrap();
            assert_eq!(g, Granularity::HalfYear);
        }
        assert_eq!(
            serde_json::to_string(&Granularity::HalfYear).unwrap(),
            "\"half_year\""
        );
    }

    #[test]
    fn test_direction_improvement() {
        assert!(Direction::Up.is_improvement(1.0));
        assert!(!Direction::Up.is_improvement(-1.0));
        assert!(Direction::Down.is_improvement(-1.0));
        assert!(!Direction::Down.is_improvement(1.0));
        assert!(Direction::Up.is_improvement(0.0));
        assert!(Direction::Down.is_improvement(0.0));
    }

    #[test]
    fn test_target_status() {
        let fcr = metric(Direction::Up, Some(80.0));
        assert_eq!(fcr.target_status(82.0), Some(TargetStatus::Met));
        assert_eq!(fcr.target_status(79.9), Some(TargetStatus::Missed));

        let aht = metric(Direction::Down, Some(420.0));
        assert_eq!(aht.target_status(400.0), Some(TargetStatus::Met));
        assert_eq!(aht.target_status(440.0), Some(TargetStatus::Missed));

        assert_eq!(metric(Direction::Up, None).target_status(1.0), None);
    }

    #[test]
    fn test_metric_definition_serde() {
        let json = r#"{
            "id": "aht",
            "label": "Average Handle Time",
            "unit": "sec",
            "default_granularity": "half_year",
            "aggregation": "avg",
            "direction": "down"
        }"#;
        let def: MetricDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.default_granularity, Granularity::HalfYear);
        assert_eq!(def.direction, Direction::Down);
        assert!(def.target.is_none());
    }
}
