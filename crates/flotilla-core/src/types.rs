//! Domain types for the Flotilla autoscaler.
//!
//! These types describe one poll cycle's view of a container fleet and the
//! single action the decision engine produces from it. All types are
//! serializable to/from JSON for transport between the metrics source, the
//! engine, and the actuator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The metrics the decision engine knows how to compare against thresholds.
///
/// `cpuUsage`/`memoryUsage` are averaged readings; `currentCpu`/
/// `currentMemory` are instantaneous. Response times are milliseconds,
/// CPU/memory are percentages, `sessions` is a plain count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricName {
    PubSubResponseTime,
    MethodResponseTime,
    CpuUsage,
    CurrentCpu,
    MemoryUsage,
    CurrentMemory,
    Sessions,
}

impl MetricName {
    /// Every recognized metric, in a fixed order.
    pub const ALL: [MetricName; 7] = [
        MetricName::PubSubResponseTime,
        MetricName::MethodResponseTime,
        MetricName::CpuUsage,
        MetricName::CurrentCpu,
        MetricName::MemoryUsage,
        MetricName::CurrentMemory,
        MetricName::Sessions,
    ];

    /// The camelCase name used in configuration documents and reason text.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::PubSubResponseTime => "pubSubResponseTime",
            MetricName::MethodResponseTime => "methodResponseTime",
            MetricName::CpuUsage => "cpuUsage",
            MetricName::CurrentCpu => "currentCpu",
            MetricName::MemoryUsage => "memoryUsage",
            MetricName::CurrentMemory => "currentMemory",
            MetricName::Sessions => "sessions",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of numeric metric values. Missing entries read as `0.0`, matching
/// the aggregation policy of defaulting absent telemetry to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet(BTreeMap<MetricName, f64>);

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metric value, returning `self` for builder-style chaining.
    pub fn with(mut self, name: MetricName, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: MetricName, value: f64) {
        self.0.insert(name, value);
    }

    /// The value for `name`, or `0.0` when absent.
    pub fn value(&self, name: MetricName) -> f64 {
        self.0.get(&name).copied().unwrap_or(0.0)
    }

    pub fn get(&self, name: MetricName) -> Option<f64> {
        self.0.get(&name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Lifecycle state of one container as reported by the orchestration
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Starting,
    Running,
    Stopping,
}

impl ContainerState {
    pub fn is_running(self) -> bool {
        self == ContainerState::Running
    }

    /// Starting or stopping: the container is mid-transition and must not
    /// participate in averaging or kill selection.
    pub fn is_transitioning(self) -> bool {
        !self.is_running()
    }
}

/// One container's raw sample from the metrics source.
///
/// Metric values arrive as display strings (`"(45%)"`, `"120 ms"`,
/// `"512 MB"`); the aggregator parses them into numbers. Unknown metric
/// keys are tolerated and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    /// Unique identifier, stable across polls.
    pub name: String,
    pub state: ContainerState,
    #[serde(default)]
    pub metrics: BTreeMap<String, String>,
}

/// The fleet as observed in one poll cycle. Immutable input to one
/// evaluation; nothing is retained across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    /// Desired/total container count as tracked by the orchestration
    /// backend.
    pub quantity: u32,
    #[serde(default)]
    pub containers: Vec<ContainerStats>,
    /// True while a previously issued scale operation has not settled.
    #[serde(default)]
    pub scaling_in_flight: bool,
}

/// The single action produced by one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    None,
    ScaleUp {
        to_quantity: u32,
        adding: u32,
        reason: String,
    },
    ScaleDown {
        to_quantity: u32,
        reducing: u32,
        reason: String,
    },
    Kill {
        container: String,
        reason: String,
    },
}

impl Action {
    pub fn is_none(&self) -> bool {
        matches!(self, Action::None)
    }

    /// The human-readable justification, if the action carries one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Action::None => None,
            Action::ScaleUp { reason, .. }
            | Action::ScaleDown { reason, .. }
            | Action::Kill { reason, .. } => Some(reason),
        }
    }
}
