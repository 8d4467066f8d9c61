//! Aggregator
//!
//! Reduces each rollup bucket to a single value according to the metric's
//! aggregation policy and orders the result chronologically.

use serde::{Deserialize, Serialize};

use super::rollup::{rollup, validate_records, PeriodRecord, RejectedRecord};
use crate::error::Result;
use crate::types::{AggregatedBucket, Aggregation, Granularity, RawRecord};

/// What to do with records whose period string is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Drop malformed records, report them alongside the buckets
    #[default]
    Skip,
    /// Fail on the first malformed record
    Strict,
}

impl Aggregation {
    /// Combine a bucket's values. Empty input yields 0.
    pub fn apply(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let sum: f64 = values.iter().sum();
        match self {
            Aggregation::Sum => sum,
            Aggregation::Avg => sum / values.len() as f64,
        }
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Aggregate validated records into display buckets, oldest first.
pub fn aggregate(
    records: &[PeriodRecord],
    granularity: Granularity,
    aggregation: Aggregation,
) -> Vec<AggregatedBucket> {
    let buckets = rollup(records, granularity);

    // BTreeMap iteration is already chronological
    let result: Vec<AggregatedBucket> = buckets
        .into_iter()
        .map(|(period, values)| AggregatedBucket {
            label: period.to_string(),
            value: round1(aggregation.apply(&values)),
            sort_key: period.sort_key(),
        })
        .collect();

    debug_assert!(result.windows(2).all(|w| w[0].sort_key <= w[1].sort_key));
    result
}

/// Buckets plus the records that were rejected on the way in.
#[derive(Debug, Default)]
pub struct Aggregated {
    pub buckets: Vec<AggregatedBucket>,
    pub rejected: Vec<RejectedRecord>,
}

/// Validate raw records and aggregate them.
///
/// In [`ValidationMode::Strict`] the first malformed record aborts with
/// [`crate::Error::MalformedPeriod`]; otherwise malformed records are returned in
/// [`Aggregated::rejected`] and excluded from every bucket.
pub fn aggregate_raw(
    records: &[RawRecord],
    granularity: Granularity,
    aggregation: Aggregation,
    mode: ValidationMode,
) -> Result<Aggregated> {
    let set = validate_records(records);

    if mode == ValidationMode::Strict {
        if let Some(first) = set.rejected.into_iter().next() {
            return Err(first.error);
        }
        return Ok(Aggregated {
            buckets: aggregate(&set.accepted, granularity, aggregation),
            rejected: Vec::new(),
        });
    }

    Ok(Aggregated {
        buckets: aggregate(&set.accepted, granularity, aggregation),
        rejected: set.rejected,
    })
}
