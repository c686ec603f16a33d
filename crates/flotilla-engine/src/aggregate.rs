//! Fleet aggregation — raw container samples to numeric views and a
//! fleet-wide average.
//!
//! Metric values arrive as display strings (`"(45%)"`, `"120 ms"`,
//! `"512 MB"`). Parse failures default to zero rather than propagating:
//! missing telemetry should bias toward inaction, and zero is the safe
//! default for every metric used in `above` comparisons.

use flotilla_core::{ContainerState, ContainerStats, MetricName, MetricSet};

/// One container with its metrics parsed into numeric form.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerView {
    pub name: String,
    pub state: ContainerState,
    pub metrics: MetricSet,
}

impl ContainerView {
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

/// Parse every container's raw metric strings. Every recognized metric is
/// materialized, unparsable or absent values as `0.0`.
pub fn normalize(containers: &[ContainerStats]) -> Vec<ContainerView> {
    containers
        .iter()
        .map(|container| {
            let mut metrics = MetricSet::new();
            for name in MetricName::ALL {
                let value = container
                    .metrics
                    .get(name.as_str())
                    .and_then(|raw| parse_value(raw))
                    .unwrap_or(0.0);
                metrics.set(name, value);
            }
            ContainerView {
                name: container.name.clone(),
                state: container.state,
                metrics,
            }
        })
        .collect()
}

/// Arithmetic mean of each metric over running containers only.
///
/// Computed as sum/count per metric. Returns `None` when no container is
/// running; callers must treat that as "metrics unavailable", not zero.
pub fn fleet_average(views: &[ContainerView]) -> Option<MetricSet> {
    let running: Vec<&ContainerView> = views.iter().filter(|v| v.is_running()).collect();
    if running.is_empty() {
        return None;
    }

    let count = running.len() as f64;
    let mut average = MetricSet::new();
    for name in MetricName::ALL {
        let sum: f64 = running.iter().map(|v| v.metrics.value(name)).sum();
        average.set(name, sum / count);
    }
    Some(average)
}

/// Extract the first numeric token from a display string: `"(45%)"` → 45,
/// `"120 ms"` → 120, `"1.5 GB"` → 1.5.
fn parse_value(raw: &str) -> Option<f64> {
    raw.split(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '-' || ch == '+'))
        .filter(|token| !token.is_empty())
        .find_map(|token| token.parse::<f64>().ok())
}
