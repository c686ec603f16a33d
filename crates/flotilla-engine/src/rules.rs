//! Threshold predicates and rule evaluation.
//!
//! A rule configures thresholds for predicates drawn from a fixed catalog
//! of (metric, direction) pairs. Evaluation combines the configured
//! predicates with either ALL (AND) or ANY (OR) semantics and reports the
//! matches that fired, so callers can build the justification text.

use std::fmt;

use flotilla_core::{MetricName, MetricSet, Rule};

/// Comparison direction for a threshold predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

/// One recognized predicate: a configuration key bound to a metric and a
/// comparison direction.
#[derive(Debug, Clone, Copy)]
pub struct PredicateDef {
    pub key: &'static str,
    pub metric: MetricName,
    pub direction: Direction,
}

const fn def(key: &'static str, metric: MetricName, direction: Direction) -> PredicateDef {
    PredicateDef {
        key,
        metric,
        direction,
    }
}

/// The fixed catalog of recognized predicates.
///
/// The `responseTime*` keys fan out to both response-time metrics: one
/// configured key selects both predicates.
pub const CATALOG: &[PredicateDef] = &[
    def(
        "responseTimeAbove",
        MetricName::PubSubResponseTime,
        Direction::Above,
    ),
    def(
        "responseTimeAbove",
        MetricName::MethodResponseTime,
        Direction::Above,
    ),
    def(
        "responseTimeBelow",
        MetricName::PubSubResponseTime,
        Direction::Below,
    ),
    def(
        "responseTimeBelow",
        MetricName::MethodResponseTime,
        Direction::Below,
    ),
    def("cpuAbove", MetricName::CpuUsage, Direction::Above),
    def("cpuBelow", MetricName::CpuUsage, Direction::Below),
    def("currentCpuAbove", MetricName::CurrentCpu, Direction::Above),
    def("currentCpuBelow", MetricName::CurrentCpu, Direction::Below),
    def("memoryAbove", MetricName::MemoryUsage, Direction::Above),
    def("memoryBelow", MetricName::MemoryUsage, Direction::Below),
    def(
        "currentMemoryAbove",
        MetricName::CurrentMemory,
        Direction::Above,
    ),
    def(
        "currentMemoryBelow",
        MetricName::CurrentMemory,
        Direction::Below,
    ),
    def("sessionsAbove", MetricName::Sessions, Direction::Above),
    def("sessionsBelow", MetricName::Sessions, Direction::Below),
];

/// How a rule's configured predicates are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    /// Every configured predicate must match (AND).
    All,
    /// At least one configured predicate must match (OR).
    Any,
}

/// A predicate that matched, with the concrete values needed for the
/// justification text.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateMatch {
    pub metric: MetricName,
    pub value: f64,
    pub key: &'static str,
    pub threshold: f64,
    pub direction: Direction,
}

impl fmt::Display for PredicateMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comparison = match self.direction {
            Direction::Above => "greater",
            Direction::Below => "less",
        };
        write!(
            f,
            "{} {} is {} than {} {}",
            self.metric,
            fmt_value(self.value),
            comparison,
            self.key,
            fmt_value(self.threshold)
        )
    }
}

/// Outcome of evaluating one rule against one metric set.
///
/// `NotApplicable` (no recognized predicates configured) is distinct from
/// `NoMatch` (configured but the combination did not fire); downstream
/// priority ordering depends on the distinction.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    NotApplicable,
    NoMatch,
    Fired(Vec<PredicateMatch>),
}

impl RuleOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, RuleOutcome::Fired(_))
    }
}

/// Evaluate `rule` against `metrics`, combining configured predicates per
/// `mode`.
pub fn evaluate(rule: &Rule, metrics: &MetricSet, mode: CombineMode) -> RuleOutcome {
    let configured: Vec<(&PredicateDef, f64)> = CATALOG
        .iter()
        .filter_map(|d| rule.threshold(d.key).map(|t| (d, t)))
        .collect();
    if configured.is_empty() {
        return RuleOutcome::NotApplicable;
    }

    let mut matched = Vec::new();
    for (def, threshold) in &configured {
        let value = metrics.value(def.metric);
        let hit = match def.direction {
            Direction::Above => value > *threshold,
            Direction::Below => value < *threshold,
        };
        if hit {
            matched.push(PredicateMatch {
                metric: def.metric,
                value,
                key: def.key,
                threshold: *threshold,
                direction: def.direction,
            });
        }
    }

    let fired = match mode {
        CombineMode::All => matched.len() == configured.len(),
        CombineMode::Any => !matched.is_empty(),
    };
    if fired {
        RuleOutcome::Fired(matched)
    } else {
        RuleOutcome::NoMatch
    }
}

/// Build the comma-separated justification text from the matched
/// predicates. The structure is fixed for notifier compatibility.
pub fn describe(matches: &[PredicateMatch]) -> String {
    matches
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render whole numbers without a trailing `.0` so reason text reads
/// `cpuUsage 95`, not `cpuUsage 95.0`.
fn fmt_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
