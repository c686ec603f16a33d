//! The scaling decision engine.
//!
//! One `FleetSnapshot` in, exactly one `Action` out, evaluated in a fixed
//! priority order:
//!
//! ```text
//! 1. hard bounds        (bypasses rules and the cooldown gate)
//! 2. kill evaluation    (ALL mode, safe even mid-scale)
//! 3. cooldown gate      (scaling_in_flight suppresses the rest)
//! 4. scale-up           (ANY mode against the fleet average)
//! 5. scale-down         (ALL mode against the session-adjusted average)
//! 6. none
//! ```
//!
//! The engine is pure and never fails: configuration problems degrade to
//! rules that never fire, data problems degrade to zeroed metrics, and
//! structural problems produce `Action::None`.

use flotilla_core::{Action, FleetSnapshot, MetricName, MetricSet, RuleSet};
use tracing::debug;

use crate::aggregate;
use crate::kill;
use crate::rules::{self, CombineMode, RuleOutcome};

/// Evaluates fleet snapshots against a rule set. Stateless across cycles;
/// the cooldown flag travels inside the snapshot.
#[derive(Debug, Clone)]
pub struct Engine {
    rules: RuleSet,
}

impl Engine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Compute the single action for one poll cycle.
    pub fn evaluate(&self, snapshot: &FleetSnapshot) -> Action {
        let limits = &self.rules;
        let views = aggregate::normalize(&snapshot.containers);
        // Transitioning containers count toward the bound checks.
        let observed = views.len() as u32;
        let quantity = snapshot.quantity;

        // 1. Hard bounds are safety rails: they ignore the rule set and
        // the cooldown gate.
        if observed < limits.min_containers {
            debug!(observed, min = limits.min_containers, "below minimum bound");
            return Action::ScaleUp {
                to_quantity: limits.min_containers,
                adding: limits.min_containers - observed,
                reason: "below minimum".to_string(),
            };
        }
        if observed > limits.max_containers {
            debug!(observed, max = limits.max_containers, "above maximum bound");
            return Action::ScaleDown {
                to_quantity: limits.max_containers,
                reducing: observed - limits.max_containers,
                reason: "above maximum".to_string(),
            };
        }

        // 2. Kill evaluation runs against the candidate's own metrics and
        // is independent of scaling_in_flight.
        if let Some(candidate) = kill::select(&views, quantity)
            && let RuleOutcome::Fired(matches) =
                rules::evaluate(&limits.kill_when, &candidate.metrics, CombineMode::All)
        {
            let reason = rules::describe(&matches);
            debug!(container = %candidate.name, %reason, "kill rule fired");
            return Action::Kill {
                container: candidate.name.clone(),
                reason,
            };
        }

        // 3. Cooldown: a scale operation is still settling.
        if scaling_in_flight(snapshot) {
            debug!("scale operation in flight, holding");
            return Action::None;
        }

        // 4–5 need the fleet average; with no running containers it is
        // undefined and both rules are treated as not applicable.
        let Some(average) = aggregate::fleet_average(&views) else {
            return Action::None;
        };
        let running = views.iter().filter(|v| v.is_running()).count() as u32;

        // 4. Scale-up: any single distress signal triggers growth.
        if quantity < limits.max_containers
            && let RuleOutcome::Fired(matches) =
                rules::evaluate(&limits.add_when, &average, CombineMode::Any)
        {
            let step = limits
                .containers_per_step
                .min(limits.max_containers - quantity)
                .max(1);
            let reason = rules::describe(&matches);
            debug!(to = quantity + step, %reason, "scale-up rule fired");
            return Action::ScaleUp {
                to_quantity: quantity + step,
                adding: step,
                reason,
            };
        }

        // 5. Scale-down: all configured conditions must hold against the
        // average with session load re-projected onto the remaining
        // containers.
        if quantity > limits.min_containers {
            let adjusted = project_sessions_after_removal(&average, running);
            if let RuleOutcome::Fired(matches) =
                rules::evaluate(&limits.reduce_when, &adjusted, CombineMode::All)
            {
                let step = limits
                    .containers_per_step
                    .min(quantity - limits.min_containers)
                    .max(1);
                let reason = rules::describe(&matches);
                debug!(to = quantity - step, %reason, "scale-down rule fired");
                return Action::ScaleDown {
                    to_quantity: quantity - step,
                    reducing: step,
                    reason,
                };
            }
        }

        Action::None
    }
}

/// Cooldown gate: the flag is supplied fresh by the metrics source each
/// cycle, never tracked by the engine.
fn scaling_in_flight(snapshot: &FleetSnapshot) -> bool {
    snapshot.scaling_in_flight
}

/// Estimate the per-container session load after removing one running
/// container, assuming uniform redistribution: `sessions * n / (n - 1)`.
///
/// An approximation: it models removing an average container, not the one
/// actually selected for removal. With a single running container the
/// adjustment is undefined and the average is used as-is.
fn project_sessions_after_removal(average: &MetricSet, running: u32) -> MetricSet {
    if running <= 1 {
        return average.clone();
    }
    let n = running as f64;
    let mut adjusted = average.clone();
    adjusted.set(
        MetricName::Sessions,
        average.value(MetricName::Sessions) * n / (n - 1.0),
    );
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{ContainerState, ContainerStats, Rule};

    fn container(name: &str, state: ContainerState, metrics: &[(&str, &str)]) -> ContainerStats {
        ContainerStats {
            name: name.to_string(),
            state,
            metrics: metrics
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn running(name: &str, metrics: &[(&str, &str)]) -> ContainerStats {
        container(name, ContainerState::Running, metrics)
    }

    fn snapshot(quantity: u32, containers: Vec<ContainerStats>) -> FleetSnapshot {
        FleetSnapshot {
            quantity,
            containers,
            scaling_in_flight: false,
        }
    }

    fn rule_set() -> RuleSet {
        RuleSet {
            min_containers: 2,
            max_containers: 10,
            containers_per_step: 1,
            ..RuleSet::default()
        }
    }

    #[test]
    fn below_minimum_forces_scale_up() {
        let engine = Engine::new(rule_set());
        let mut snap = snapshot(1, vec![running("a", &[])]);
        // Bound enforcement ignores the cooldown flag.
        snap.scaling_in_flight = true;

        assert_eq!(
            engine.evaluate(&snap),
            Action::ScaleUp {
                to_quantity: 2,
                adding: 1,
                reason: "below minimum".to_string(),
            }
        );
    }

    #[test]
    fn above_maximum_forces_scale_down() {
        // Scenario C: six observed, max five, no rules configured.
        let mut rules = rule_set();
        rules.max_containers = 5;
        let engine = Engine::new(rules);
        let containers = (0..6).map(|i| running(&format!("c{i}"), &[])).collect();

        assert_eq!(
            engine.evaluate(&snapshot(6, containers)),
            Action::ScaleDown {
                to_quantity: 5,
                reducing: 1,
                reason: "above maximum".to_string(),
            }
        );
    }

    #[test]
    fn scale_up_on_single_distress_signal() {
        let mut rules = rule_set();
        rules.add_when = Rule::new().with("cpuAbove", 80.0);
        let engine = Engine::new(rules);
        let snap = snapshot(
            2,
            vec![
                running("a", &[("cpuUsage", "(95%)")]),
                running("b", &[("cpuUsage", "(95%)")]),
            ],
        );

        assert_eq!(
            engine.evaluate(&snap),
            Action::ScaleUp {
                to_quantity: 3,
                adding: 1,
                reason: "cpuUsage 95 is greater than cpuAbove 80".to_string(),
            }
        );
    }

    #[test]
    fn scenario_a_adds_exactly_one_container() {
        // quantity=2, min=2, max=10, one running container at 95% CPU.
        let mut rules = rule_set();
        rules.add_when = Rule::new().with("cpuAbove", 80.0);
        let engine = Engine::new(rules);
        let snap = snapshot(2, vec![running("a", &[("cpuUsage", "(95%)")])]);

        match engine.evaluate(&snap) {
            Action::ScaleUp { adding, .. } => assert_eq!(adding, 1),
            other => panic!("expected ScaleUp, got {other:?}"),
        }
    }

    #[test]
    fn scenario_b_session_adjustment_blocks_reduction() {
        // cpuAverage=5, sessionsAverage=4.8 over 5 containers; adjusted
        // sessions become 4.8 * 5/4 = 6, which fails sessionsBelow 5.
        let mut rules = rule_set();
        rules.reduce_when = Rule::new().with("cpuBelow", 10.0).with("sessionsBelow", 5.0);
        let engine = Engine::new(rules);
        let containers = (0..5)
            .map(|i| running(&format!("c{i}"), &[("cpuUsage", "5%"), ("sessions", "4.8")]))
            .collect();

        assert_eq!(engine.evaluate(&snapshot(5, containers)), Action::None);
    }

    #[test]
    fn scale_down_when_all_conditions_hold() {
        let mut rules = rule_set();
        rules.reduce_when = Rule::new().with("cpuBelow", 10.0).with("sessionsBelow", 5.0);
        let engine = Engine::new(rules);
        // Adjusted sessions: 2 * 5/4 = 2.5, still below 5.
        let containers = (0..5)
            .map(|i| running(&format!("c{i}"), &[("cpuUsage", "5%"), ("sessions", "2")]))
            .collect();

        assert_eq!(
            engine.evaluate(&snapshot(5, containers)),
            Action::ScaleDown {
                to_quantity: 4,
                reducing: 1,
                reason: "cpuUsage 5 is less than cpuBelow 10, \
                         sessions 2.5 is less than sessionsBelow 5"
                    .to_string(),
            }
        );
    }

    #[test]
    fn scenario_d_kill_excludes_starting_container() {
        let mut rules = rule_set();
        rules.kill_when = Rule::new().with("currentCpuAbove", 90.0);
        let engine = Engine::new(rules);
        let snap = snapshot(
            3,
            vec![
                running("a", &[("currentCpu", "(40%)")]),
                running("b", &[("currentCpu", "(50%)")]),
                container("hot", ContainerState::Starting, &[("currentCpu", "(99%)")]),
            ],
        );

        assert_eq!(engine.evaluate(&snap), Action::None);
    }

    #[test]
    fn kill_targets_hottest_running_container() {
        let mut rules = rule_set();
        rules.kill_when = Rule::new().with("currentCpuAbove", 90.0);
        let engine = Engine::new(rules);
        let mut snap = snapshot(
            3,
            vec![
                running("a", &[("currentCpu", "(40%)")]),
                running("b", &[("currentCpu", "(95%)")]),
                running("c", &[("currentCpu", "(60%)")]),
            ],
        );
        // Killing a stuck container is safe even mid-scale.
        snap.scaling_in_flight = true;

        assert_eq!(
            engine.evaluate(&snap),
            Action::Kill {
                container: "b".to_string(),
                reason: "currentCpu 95 is greater than currentCpuAbove 90".to_string(),
            }
        );
    }

    #[test]
    fn kill_never_combined_with_scaling() {
        // Both kill and add rules would fire; kill wins and is the only
        // action this cycle.
        let mut rules = rule_set();
        rules.kill_when = Rule::new().with("currentCpuAbove", 90.0);
        rules.add_when = Rule::new().with("cpuAbove", 50.0);
        let engine = Engine::new(rules);
        let snap = snapshot(
            3,
            vec![
                running("a", &[("currentCpu", "(95%)"), ("cpuUsage", "(95%)")]),
                running("b", &[("currentCpu", "(10%)"), ("cpuUsage", "(95%)")]),
                running("c", &[("currentCpu", "(10%)"), ("cpuUsage", "(95%)")]),
            ],
        );

        assert!(matches!(engine.evaluate(&snap), Action::Kill { .. }));
    }

    #[test]
    fn cooldown_suppresses_scaling_rules() {
        let mut rules = rule_set();
        rules.add_when = Rule::new().with("cpuAbove", 80.0);
        let engine = Engine::new(rules);
        let mut snap = snapshot(
            2,
            vec![
                running("a", &[("cpuUsage", "(95%)")]),
                running("b", &[("cpuUsage", "(95%)")]),
            ],
        );
        snap.scaling_in_flight = true;

        assert_eq!(engine.evaluate(&snap), Action::None);
    }

    #[test]
    fn step_clamps_to_remaining_headroom() {
        let mut rules = rule_set();
        rules.containers_per_step = 3;
        rules.add_when = Rule::new().with("cpuAbove", 80.0);
        let engine = Engine::new(rules);
        let containers = (0..9)
            .map(|i| running(&format!("c{i}"), &[("cpuUsage", "(95%)")]))
            .collect();

        // quantity 9 of max 10: configured step 3 clamps to 1.
        assert_eq!(
            engine.evaluate(&snapshot(9, containers)),
            Action::ScaleUp {
                to_quantity: 10,
                adding: 1,
                reason: "cpuUsage 95 is greater than cpuAbove 80".to_string(),
            }
        );
    }

    #[test]
    fn step_never_undershoots_minimum() {
        let mut rules = rule_set();
        rules.containers_per_step = 3;
        rules.reduce_when = Rule::new().with("cpuBelow", 10.0);
        let engine = Engine::new(rules);
        let containers = (0..3)
            .map(|i| running(&format!("c{i}"), &[("cpuUsage", "2%")]))
            .collect();

        // quantity 3 of min 2: configured step 3 clamps to 1.
        match engine.evaluate(&snapshot(3, containers)) {
            Action::ScaleDown {
                to_quantity,
                reducing,
                ..
            } => {
                assert_eq!(to_quantity, 2);
                assert_eq!(reducing, 1);
            }
            other => panic!("expected ScaleDown, got {other:?}"),
        }
    }

    #[test]
    fn at_maximum_quantity_never_scales_up() {
        let mut rules = rule_set();
        rules.max_containers = 3;
        rules.add_when = Rule::new().with("cpuAbove", 10.0);
        let engine = Engine::new(rules);
        let containers = (0..3)
            .map(|i| running(&format!("c{i}"), &[("cpuUsage", "(95%)")]))
            .collect();

        assert_eq!(engine.evaluate(&snapshot(3, containers)), Action::None);
    }

    #[test]
    fn no_running_containers_means_no_rule_actions() {
        let mut rules = rule_set();
        rules.min_containers = 0;
        rules.add_when = Rule::new().with("cpuAbove", 0.0);
        let engine = Engine::new(rules);
        let snap = snapshot(
            2,
            vec![
                container("a", ContainerState::Starting, &[]),
                container("b", ContainerState::Starting, &[]),
            ],
        );

        assert_eq!(engine.evaluate(&snap), Action::None);
    }

    #[test]
    fn unconfigured_rules_never_fire() {
        let engine = Engine::new(rule_set());
        let snap = snapshot(
            3,
            vec![
                running("a", &[("cpuUsage", "(95%)"), ("sessions", "0")]),
                running("b", &[("cpuUsage", "(95%)"), ("sessions", "0")]),
                running("c", &[("cpuUsage", "(95%)"), ("sessions", "0")]),
            ],
        );

        assert_eq!(engine.evaluate(&snap), Action::None);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut rules = rule_set();
        rules.add_when = Rule::new().with("cpuAbove", 80.0);
        let engine = Engine::new(rules);
        let snap = snapshot(
            2,
            vec![
                running("a", &[("cpuUsage", "(95%)")]),
                running("b", &[("cpuUsage", "(85%)")]),
            ],
        );

        assert_eq!(engine.evaluate(&snap), engine.evaluate(&snap));
    }

    #[test]
    fn single_running_container_skips_session_adjustment() {
        let mut rules = rule_set();
        rules.min_containers = 0;
        rules.reduce_when = Rule::new().with("sessionsBelow", 5.0);
        let engine = Engine::new(rules);
        let snap = snapshot(1, vec![running("solo", &[("sessions", "4")])]);

        // With n=1 the projection is undefined; the raw average (4) is
        // compared instead and the rule fires.
        match engine.evaluate(&snap) {
            Action::ScaleDown { to_quantity, .. } => assert_eq!(to_quantity, 0),
            other => panic!("expected ScaleDown, got {other:?}"),
        }
    }
}
