//! Record store abstraction
//!
//! The engine reads metric definitions and records through [`RecordStore`].
//! [`crate::Database`] is the persistent implementation; [`MemoryStore`]
//! serves tests and hosts that keep records in memory.

use std::collections::HashMap;

use crate::error::Result;
use crate::types::{MetricDefinition, RawRecord};

/// Read-only access to KPI definitions and their records.
pub trait RecordStore {
    /// Look up a single metric definition.
    fn metric(&self, id: &str) -> Result<Option<MetricDefinition>>;

    /// All metric definitions, in a stable order.
    fn metrics(&self) -> Result<Vec<MetricDefinition>>;

    /// All records of a metric. Order is irrelevant to the engine.
    fn records(&self, metric_id: &str) -> Result<Vec<RawRecord>>;
}

/// In-memory record store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    metrics: Vec<MetricDefinition>,
    records: HashMap<String, Vec<RawRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a metric definition.
    pub fn upsert_metric(&mut self, metric: MetricDefinition) {
        match self.metrics.iter_mut().find(|m| m.id == metric.id) {
            Some(existing) => *existing = metric,
            None => self.metrics.push(metric),
        }
    }

    /// Append a record to a metric.
    pub fn push_record(&mut self, metric_id: &str, record: RawRecord) {
        self.records
            .entry(metric_id.to_string())
            .or_default()
            .push(record);
    }

    /// Replace all records of a metric.
    pub fn set_records(&mut self, metric_id: &str, records: Vec<RawRecord>) {
        self.records.insert(metric_id.to_string(), records);
    }
}

impl RecordStore for MemoryStore {
    fn metric(&self, id: &str) -> Result<Option<MetricDefinition>> {
        Ok(self.metrics.iter().find(|m| m.id == id).cloned())
    }

    fn metrics(&self) -> Result<Vec<MetricDefinition>> {
        Ok(self.metrics.clone())
    }

    fn records(&self, metric_id: &str) -> Result<Vec<RawRecord>> {
        Ok(self.records.get(metric_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics_registry;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        let aht = metrics_registry::get_metric("aht").unwrap();
        store.upsert_metric(aht.clone());
        store.push_record("aht", RawRecord::new("2024-05", 440.0));
        store.push_record("aht", RawRecord::new("2024-05", 440.0));

        assert_eq!(store.metric("aht").unwrap(), Some(aht));
        assert_eq!(store.records("aht").unwrap().len(), 2);
        assert!(store.records("fcr").unwrap().is_empty());
        assert!(store.metric("fcr").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_definition() {
        let mut store = MemoryStore::new();
        let mut fcr = metrics_registry::get_metric("fcr").unwrap();
        store.upsert_metric(fcr.clone());
        fcr.target = Some(90.0);
        store.upsert_metric(fcr);

        let metrics = store.metrics().unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].target, Some(90.0));
    }
}
