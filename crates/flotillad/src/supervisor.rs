//! The poll-cycle supervisor.
//!
//! Once per interval: observe the fleet, evaluate the decision engine,
//! hand the action to the actuator, and notify. The engine never fails; a
//! failed observation or dispatch logs a warning and the next cycle
//! retries from a fresh snapshot. Invocations are serialized by
//! construction — one loop, one fleet.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use flotilla_core::{Action, FleetSnapshot};
use flotilla_engine::Engine;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Produces a fresh snapshot of the fleet each poll cycle.
pub trait MetricsSource {
    fn observe(&self) -> impl Future<Output = anyhow::Result<FleetSnapshot>> + Send;
}

/// Executes the chosen action. Free to retry or no-op on timeout; the
/// engine does not depend on the outcome.
pub trait Actuator {
    fn apply(&self, action: &Action) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Accepts pre-formatted alert/informational text.
pub trait Notifier {
    fn alert(&self, text: &str) -> impl Future<Output = ()> + Send;
    fn note(&self, text: &str) -> impl Future<Output = ()> + Send;
}

/// Drives one fleet: metrics source → engine → actuator → notifier.
pub struct Supervisor<S, A, N> {
    engine: Engine,
    source: S,
    actuator: A,
    notifier: N,
    app_name: String,
    interval: Duration,
}

impl<S, A, N> Supervisor<S, A, N>
where
    S: MetricsSource,
    A: Actuator,
    N: Notifier,
{
    pub fn new(
        engine: Engine,
        source: S,
        actuator: A,
        notifier: N,
        app_name: String,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            source,
            actuator,
            notifier,
            app_name,
            interval,
        }
    }

    /// Run one poll cycle and return the action that was decided.
    pub async fn cycle(&self) -> anyhow::Result<Action> {
        let snapshot = self
            .source
            .observe()
            .await
            .context("metrics source failed")?;
        debug!(
            quantity = snapshot.quantity,
            containers = snapshot.containers.len(),
            scaling_in_flight = snapshot.scaling_in_flight,
            "fleet observed"
        );

        let action = self.engine.evaluate(&snapshot);
        match &action {
            Action::None => {
                debug!("no action this cycle");
            }
            Action::ScaleUp {
                to_quantity,
                adding,
                reason,
            } => {
                info!(to = to_quantity, adding, %reason, "scaling up");
                self.dispatch(&action).await;
                self.notifier
                    .note(&format!(
                        "{}scaling up to {to_quantity} (adding {adding}): {reason}",
                        self.prefix()
                    ))
                    .await;
            }
            Action::ScaleDown {
                to_quantity,
                reducing,
                reason,
            } => {
                info!(to = to_quantity, reducing, %reason, "scaling down");
                self.dispatch(&action).await;
                self.notifier
                    .note(&format!(
                        "{}scaling down to {to_quantity} (reducing {reducing}): {reason}",
                        self.prefix()
                    ))
                    .await;
            }
            Action::Kill { container, reason } => {
                warn!(%container, %reason, "killing container");
                self.dispatch(&action).await;
                self.notifier
                    .alert(&format!(
                        "{}killing container {container}: {reason}",
                        self.prefix()
                    ))
                    .await;
            }
        }
        Ok(action)
    }

    /// Run the poll loop until shutdown signal.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            app = %self.app_name,
            "autoscale supervisor started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.cycle().await {
                        warn!(error = %e, "poll cycle failed, will retry next interval");
                    }
                }
                _ = shutdown.changed() => {
                    info!("supervisor shutting down");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, action: &Action) {
        if let Err(e) = self.actuator.apply(action).await {
            warn!(error = %e, "actuator dispatch failed");
        }
    }

    fn prefix(&self) -> String {
        if self.app_name.is_empty() {
            String::new()
        } else {
            format!("{}: ", self.app_name)
        }
    }
}
