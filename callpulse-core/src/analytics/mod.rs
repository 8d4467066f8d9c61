//! KPI analytics for callpulse
//!
//! The dashboard pipeline, leaf first:
//! - [`rollup`]: validate record periods and group records into buckets at
//!   the display granularity (finer rolls into coarser, never the reverse)
//! - [`aggregate`]: reduce each bucket with the metric's sum/avg policy
//! - [`compare`]: pairwise period comparison and default pair selection
//! - [`dashboard`]: selection state that re-runs the pipeline on change
//!
//! Every stage is a pure function of its inputs; records are never mutated.
//!
//! ```text
//! RawRecord[] ──validate──▶ PeriodRecord[] ──rollup──▶ {Period: [f64]}
//!                                                          │
//!                       ComparisonResult ◀──compare── AggregatedBucket[]
//! ```

pub mod aggregate;
pub mod compare;
pub mod dashboard;
pub mod metrics_registry;
pub mod rollup;

pub use aggregate::{aggregate, aggregate_raw, round1, Aggregated, ValidationMode};
pub use compare::{bucket_value, compare, default_pair, ComparisonResult, PeriodPair};
pub use dashboard::{Dashboard, DashboardOptions, DashboardState};
pub use rollup::{rollup, validate_records, PeriodRecord, RecordSet, RejectedRecord};
