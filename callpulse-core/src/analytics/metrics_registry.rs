//! Built-in call-center KPI catalog.
//!
//! These definitions seed a fresh record store. Admins may edit or replace
//! them; the engine only reads whatever the store holds.

use crate::types::{Aggregation, Direction, Granularity, MetricDefinition};

/// Static descriptor for a built-in KPI.
#[derive(Debug, Clone, Copy)]
pub struct MetricDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub target: Option<f64>,
    pub default_granularity: Granularity,
    pub aggregation: Aggregation,
    pub direction: Direction,
    pub summary: &'static str,
}

impl MetricDescriptor {
    pub fn to_definition(&self) -> MetricDefinition {
        MetricDefinition {
            id: self.id.to_string(),
            label: self.label.to_string(),
            unit: self.unit.to_string(),
            target: self.target,
            default_granularity: self.default_granularity,
            aggregation: self.aggregation,
            direction: self.direction,
        }
    }
}

const CALL_CENTER_METRICS: &[MetricDescriptor] = &[
    MetricDescriptor {
        id: "aht",
        label: "Average Handle Time",
        unit: "sec",
        target: Some(420.0),
        default_granularity: Granularity::Month,
        aggregation: Aggregation::Avg,
        direction: Direction::Down,
        summary: "Talk, hold and after-call work time per handled call.",
    },
    MetricDescriptor {
        id: "fcr",
        label: "First Contact Resolution",
        unit: "%",
        target: Some(75.0),
        default_granularity: Granularity::Month,
        aggregation: Aggregation::Avg,
        direction: Direction::Up,
        summary: "Share of contacts resolved without a follow-up.",
    },
    MetricDescriptor {
        id: "csat",
        label: "Customer Satisfaction",
        unit: "%",
        target: Some(85.0),
        default_granularity: Granularity::Quarter,
        aggregation: Aggregation::Avg,
        direction: Direction::Up,
        summary: "Share of surveyed customers rating the contact as satisfied.",
    },
    MetricDescriptor {
        id: "abandon_rate",
        label: "Abandonment Rate",
        unit: "%",
        target: Some(5.0),
        default_granularity: Granularity::Month,
        aggregation: Aggregation::Avg,
        direction: Direction::Down,
        summary: "Share of offered calls the caller hung up on before answer.",
    },
    MetricDescriptor {
        id: "service_level",
        label: "Service Level",
        unit: "%",
        target: Some(80.0),
        default_granularity: Granularity::Month,
        aggregation: Aggregation::Avg,
        direction: Direction::Up,
        summary: "Share of calls answered within the service-level threshold.",
    },
    MetricDescriptor {
        id: "call_volume",
        label: "Call Volume",
        unit: "calls",
        target: None,
        default_granularity: Granularity::Quarter,
        aggregation: Aggregation::Sum,
        direction: Direction::Up,
        summary: "Number of inbound calls handled.",
    },
    MetricDescriptor {
        id: "occupancy",
        label: "Agent Occupancy",
        unit: "%",
        target: Some(85.0),
        default_granularity: Granularity::Month,
        aggregation: Aggregation::Avg,
        direction: Direction::Up,
        summary: "Share of logged-in time agents spend handling contacts.",
    },
    MetricDescriptor {
        id: "attrition",
        label: "Agent Attrition",
        unit: "agents",
        target: None,
        default_granularity: Granularity::HalfYear,
        aggregation: Aggregation::Sum,
        direction: Direction::Down,
        summary: "Number of agents who left the center.",
    },
];

/// List all built-in metric descriptors.
pub fn list_descriptors() -> &'static [MetricDescriptor] {
    CALL_CENTER_METRICS
}

/// List all built-in metrics as definitions.
pub fn list_metrics() -> Vec<MetricDefinition> {
    CALL_CENTER_METRICS
        .iter()
        .map(MetricDescriptor::to_definition)
        .collect()
}

/// Look up a built-in metric by id.
pub fn get_metric(id: &str) -> Option<MetricDefinition> {
    CALL_CENTER_METRICS
        .iter()
        .find(|m| m.id == id)
        .map(MetricDescriptor::to_definition)
}

/// One-line description of a built-in metric.
pub fn summary(id: &str) -> Option<&'static str> {
    CALL_CENTER_METRICS
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = list_descriptors().iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), list_descriptors().len());
    }

    #[test]
    fn test_get_metric() {
        let aht = get_metric("aht").unwrap();
        assert_eq!(aht.direction, Direction::Down);
        assert_eq!(aht.aggregation, Aggregation::Avg);
        assert!(get_metric("unknown").is_none());
    }

    #[test]
    fn test_summary() {
        assert_eq!(summary("call_volume"), Some("Number of inbound calls handled."));
        assert!(summary("custom_kpi").is_none());
    }
}
