//! KPI dashboard selection state.
//!
//! [`Dashboard`] owns the current selections (metric, granularity, comparison
//! periods) and re-runs the aggregation pipeline whenever one of its inputs
//! changes. Everything else is derived and can be rebuilt from
//! [`DashboardState`] at any time.

use serde::{Deserialize, Serialize};

use super::aggregate::{aggregate_raw, Aggregated, ValidationMode};
use super::compare::{compare, default_pair, ComparisonResult};
use super::rollup::RejectedRecord;
use crate::error::{Error, Result};
use crate::store::RecordStore;
use crate::types::{AggregatedBucket, Granularity, MetricDefinition};

/// The host-owned, serializable part of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardState {
    pub metric_id: Option<String>,
    pub granularity: Option<Granularity>,
    pub period_a: Option<String>,
    pub period_b: Option<String>,
}

/// Knobs that come from configuration rather than user interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardOptions {
    /// How malformed record periods are handled
    pub validation: ValidationMode,
    /// Granularity used on metric selection instead of the metric's default
    pub granularity_override: Option<Granularity>,
}

/// Dashboard view model over a record store.
pub struct Dashboard<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    options: DashboardOptions,
    state: DashboardState,
    metric: Option<MetricDefinition>,
    buckets: Vec<AggregatedBucket>,
    rejected: Vec<RejectedRecord>,
}

impl<'a, S: RecordStore + ?Sized> Dashboard<'a, S> {
    pub fn new(store: &'a S, options: DashboardOptions) -> Self {
        Self {
            store,
            options,
            state: DashboardState::default(),
            metric: None,
            buckets: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Rebuild a dashboard from previously saved state.
    ///
    /// Saved comparison periods are kept as-is, even if they no longer exist
    /// in the series; missing ones fall back to the default pair.
    pub fn restore(store: &'a S, options: DashboardOptions, saved: DashboardState) -> Result<Self> {
        let mut dashboard = Self::new(store, options);
        let Some(metric_id) = saved.metric_id.as_deref() else {
            dashboard.state.granularity = saved.granularity;
            return Ok(dashboard);
        };

        dashboard.select_metric(metric_id)?;
        if let Some(granularity) = saved.granularity {
            dashboard.set_granularity(granularity)?;
        }
        if let Some(a) = saved.period_a {
            dashboard.state.period_a = Some(a);
        }
        if let Some(b) = saved.period_b {
            dashboard.state.period_b = Some(b);
        }
        Ok(dashboard)
    }

    /// Make `metric_id` the active metric.
    ///
    /// Switches to the metric's default granularity (or the configured
    /// override) and resets the comparison pair. If the series cannot be
    /// built, the previous selection stays active.
    pub fn select_metric(&mut self, metric_id: &str) -> Result<()> {
        let metric = self
            .store
            .metric(metric_id)?
            .ok_or_else(|| Error::MetricNotFound(metric_id.to_string()))?;
        let granularity = self
            .options
            .granularity_override
            .unwrap_or(metric.default_granularity);

        let aggregated = self.aggregate(&metric, granularity)?;

        self.state.metric_id = Some(metric.id.clone());
        self.state.granularity = Some(granularity);
        self.metric = Some(metric);
        self.commit(aggregated);
        self.reset_pair();
        Ok(())
    }

    /// Change the display granularity and reset the comparison pair.
    ///
    /// On error the previous granularity and series are kept.
    pub fn set_granularity(&mut self, granularity: Granularity) -> Result<()> {
        let Some(metric) = self.metric.as_ref() else {
            self.state.granularity = Some(granularity);
            return Ok(());
        };
        let aggregated = self.aggregate(metric, granularity)?;

        self.state.granularity = Some(granularity);
        self.commit(aggregated);
        self.reset_pair();
        Ok(())
    }

    /// Re-read the active metric's records.
    ///
    /// The comparison pair is only reset if the set of bucket labels changed;
    /// value-only edits keep the user's selection.
    pub fn refresh(&mut self) -> Result<()> {
        let (Some(metric), Some(granularity)) = (self.metric.as_ref(), self.state.granularity)
        else {
            return Ok(());
        };
        let aggregated = self.aggregate(metric, granularity)?;

        let changed = aggregated
            .buckets
            .iter()
            .map(|b| &b.label)
            .ne(self.buckets.iter().map(|b| &b.label));
        self.commit(aggregated);
        if changed {
            self.reset_pair();
        }
        Ok(())
    }

    /// Override comparison period A.
    pub fn set_period_a(&mut self, label: impl Into<String>) {
        self.state.period_a = Some(label.into());
    }

    /// Override comparison period B.
    pub fn set_period_b(&mut self, label: impl Into<String>) {
        self.state.period_b = Some(label.into());
    }

    /// Compare the selected periods, if both are set.
    pub fn comparison(&self) -> Option<ComparisonResult> {
        let metric = self.metric.as_ref()?;
        let a = self.state.period_a.as_deref()?;
        let b = self.state.period_b.as_deref()?;
        Some(compare(&self.buckets, a, b, metric.direction))
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn metric(&self) -> Option<&MetricDefinition> {
        self.metric.as_ref()
    }

    pub fn granularity(&self) -> Option<Granularity> {
        self.state.granularity
    }

    /// Current series, oldest first. Empty means "no data in this view".
    pub fn buckets(&self) -> &[AggregatedBucket] {
        &self.buckets
    }

    /// Records of the active metric skipped for malformed periods.
    pub fn rejected(&self) -> &[RejectedRecord] {
        &self.rejected
    }

    fn aggregate(&self, metric: &MetricDefinition, granularity: Granularity) -> Result<Aggregated> {
        let records = self.store.records(&metric.id)?;
        let aggregated = aggregate_raw(
            &records,
            granularity,
            metric.aggregation,
            self.options.validation,
        )?;

        tracing::debug!(
            metric = %metric.id,
            granularity = %granularity,
            records = records.len(),
            buckets = aggregated.buckets.len(),
            rejected = aggregated.rejected.len(),
            "Recomputed KPI series"
        );
        Ok(aggregated)
    }

    fn commit(&mut self, aggregated: Aggregated) {
        self.buckets = aggregated.buckets;
        self.rejected = aggregated.rejected;
    }

    fn reset_pair(&mut self) {
        let pair = default_pair(&self.buckets);
        self.state.period_a = pair.as_ref().map(|p| p.period_a.clone());
        self.state.period_b = pair.map(|p| p.period_b);
    }
}
