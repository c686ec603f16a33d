//! Kill candidate selection.
//!
//! At most one running container is eligible for forced termination per
//! cycle: the one with the highest instantaneous CPU. Containers
//! mid-transition are never candidates, and no candidate is produced when
//! terminating one more container would leave the whole fleet in
//! transition with no stable replica.

use flotilla_core::MetricName;
use tracing::debug;

use crate::aggregate::ContainerView;

/// Choose the kill candidate among `views`, if any container is eligible.
///
/// `quantity` is the fleet's tracked container count; a candidate is only
/// returned while `transitioning + 1 < quantity`.
pub fn select<'a>(views: &'a [ContainerView], quantity: u32) -> Option<&'a ContainerView> {
    let transitioning = views.iter().filter(|v| !v.is_running()).count() as u32;
    if transitioning + 1 >= quantity {
        if views.iter().any(|v| v.is_running()) {
            debug!(
                transitioning,
                quantity, "kill suppressed: would leave no stable replica"
            );
        }
        return None;
    }

    views
        .iter()
        .filter(|v| v.is_running())
        .max_by(|a, b| {
            a.metrics
                .value(MetricName::CurrentCpu)
                .total_cmp(&b.metrics.value(MetricName::CurrentCpu))
        })
}
