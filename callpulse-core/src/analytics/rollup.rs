//! Rollup engine
//!
//! Maps a metric's records into buckets at the display granularity. Finer
//! records roll up into coarser buckets; coarser records are never split and
//! are dropped from finer views.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::period::Period;
use crate::types::{Granularity, RawRecord};

/// A record whose period has been parsed and validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodRecord {
    pub period: Period,
    pub value: f64,
}

/// A raw record that failed validation, with the reason.
#[derive(Debug)]
pub struct RejectedRecord {
    pub record: RawRecord,
    pub error: Error,
}

/// Outcome of validating a raw record set.
#[derive(Debug, Default)]
pub struct RecordSet {
    /// Records that parsed cleanly, in input order
    pub accepted: Vec<PeriodRecord>,
    /// Records with malformed periods; these never reach the rollup
    pub rejected: Vec<RejectedRecord>,
}

/// Parse every record's period, separating malformed records out.
///
/// The input slice is never modified.
pub fn validate_records(records: &[RawRecord]) -> RecordSet {
    let mut set = RecordSet::default();

    for record in records {
        match Period::parse(&record.period) {
            Ok(period) => set.accepted.push(PeriodRecord {
                period,
                value: record.value,
            }),
            Err(error) => {
                tracing::warn!(
                    period = %record.period,
                    value = record.value,
                    error = %error,
                    "Rejecting record with malformed period"
                );
                set.rejected.push(RejectedRecord {
                    record: record.clone(),
                    error,
                });
            }
        }
    }

    set
}

/// Group records into buckets at `granularity`.
///
/// Every contributing value is kept, duplicates included. Buckets only exist
/// for keys that received at least one record, so an empty input (or one with
/// nothing compatible) yields an empty map.
pub fn rollup(records: &[PeriodRecord], granularity: Granularity) -> BTreeMap<Period, Vec<f64>> {
    let mut buckets: BTreeMap<Period, Vec<f64>> = BTreeMap::new();
    let mut dropped = 0usize;

    for record in records {
        match record.period.rollup_to(granularity) {
            Some(key) => buckets.entry(key).or_default().push(record.value),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(
            dropped,
            granularity = %granularity,
            "Skipped records coarser than display granularity"
        );
    }

    buckets
}
