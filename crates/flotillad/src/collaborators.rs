//! Concrete collaborators: HTTP metrics source, HTTP/log actuators, and
//! webhook/log notifiers.
//!
//! The HTTP variants speak JSON to plain-http endpoints; the log variants
//! cover dry runs and the "silent" notification mode.

use flotilla_core::{Action, FleetSnapshot};
use serde_json::json;
use tracing::{info, warn};

use crate::http;
use crate::supervisor::{Actuator, MetricsSource, Notifier};

/// Fetches a JSON `FleetSnapshot` from an HTTP endpoint.
pub struct HttpMetricsSource {
    endpoint: String,
}

impl HttpMetricsSource {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

impl MetricsSource for HttpMetricsSource {
    async fn observe(&self) -> anyhow::Result<FleetSnapshot> {
        http::get_json(&self.endpoint).await
    }
}

/// POSTs the chosen action as JSON to the orchestration backend.
pub struct HttpActuator {
    endpoint: String,
}

impl HttpActuator {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

impl Actuator for HttpActuator {
    async fn apply(&self, action: &Action) -> anyhow::Result<()> {
        http::post_json(&self.endpoint, action).await
    }
}

/// Logs actions instead of dispatching them (dry-run mode, or no actuator
/// endpoint configured).
pub struct LogActuator;

impl Actuator for LogActuator {
    async fn apply(&self, action: &Action) -> anyhow::Result<()> {
        info!(?action, "dry-run: action not dispatched");
        Ok(())
    }
}

/// Either actuator, chosen from configuration at startup.
pub enum AnyActuator {
    Http(HttpActuator),
    Log(LogActuator),
}

impl Actuator for AnyActuator {
    async fn apply(&self, action: &Action) -> anyhow::Result<()> {
        match self {
            AnyActuator::Http(a) => a.apply(action).await,
            AnyActuator::Log(a) => a.apply(action).await,
        }
    }
}

/// POSTs `{"text": …}` to a webhook. Delivery failures are logged, never
/// propagated — notifications are best-effort.
pub struct WebhookNotifier {
    webhook: String,
}

impl WebhookNotifier {
    pub fn new(webhook: String) -> Self {
        Self { webhook }
    }

    async fn send(&self, text: &str) {
        if let Err(e) = http::post_json(&self.webhook, &json!({ "text": text })).await {
            warn!(error = %e, "webhook delivery failed");
        }
    }
}

impl Notifier for WebhookNotifier {
    async fn alert(&self, text: &str) {
        self.send(text).await;
    }

    async fn note(&self, text: &str) {
        self.send(text).await;
    }
}

/// Logs notifications instead of delivering them (silent mode, or no
/// webhook configured).
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn alert(&self, text: &str) {
        warn!(%text, "alert");
    }

    async fn note(&self, text: &str) {
        info!(%text, "note");
    }
}

/// Either notifier, chosen from configuration at startup.
pub enum AnyNotifier {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl Notifier for AnyNotifier {
    async fn alert(&self, text: &str) {
        match self {
            AnyNotifier::Webhook(n) => n.alert(text).await,
            AnyNotifier::Log(n) => n.alert(text).await,
        }
    }

    async fn note(&self, text: &str) {
        match self {
            AnyNotifier::Webhook(n) => n.note(text).await,
            AnyNotifier::Log(n) => n.note(text).await,
        }
    }
}
