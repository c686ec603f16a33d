//! flotillad — the Flotilla autoscaling daemon.
//!
//! Loads a settings document (optionally merged with a remote one), then
//! polls the metrics source on an interval, runs each snapshot through the
//! decision engine, and hands the resulting action to the actuator.
//!
//! # Usage
//!
//! ```text
//! flotillad --settings fleet.toml
//! flotillad --settings fleet.toml --once --dry-run
//! ```

mod collaborators;
mod http;
mod supervisor;

use std::path::PathBuf;

use clap::Parser;
use flotilla_core::Settings;
use flotilla_engine::Engine;
use tokio::sync::watch;
use tracing::{info, warn};

use collaborators::{
    AnyActuator, AnyNotifier, HttpActuator, HttpMetricsSource, LogActuator, LogNotifier,
    WebhookNotifier,
};
use supervisor::Supervisor;

#[derive(Parser)]
#[command(name = "flotillad", about = "Flotilla autoscaling daemon")]
struct Cli {
    /// Path to the TOML settings file.
    #[arg(long)]
    settings: PathBuf,

    /// Evaluate a single poll cycle and exit (for cron-style scheduling).
    #[arg(long)]
    once: bool,

    /// Log actions instead of dispatching them to the actuator.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flotillad=debug,flotilla=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli).await?;
    info!(app = %settings.app_name, "settings loaded");

    let engine = Engine::new(settings.autoscale.clone());
    let source = HttpMetricsSource::new(settings.source.endpoint.clone());

    let actuator = match (&settings.actuator.endpoint, settings.actuator.dry_run || cli.dry_run) {
        (Some(endpoint), false) => AnyActuator::Http(HttpActuator::new(endpoint.clone())),
        _ => {
            info!("actuator in dry-run mode");
            AnyActuator::Log(LogActuator)
        }
    };

    let notifier = match (&settings.notify.webhook, settings.notify.silent) {
        (Some(webhook), false) => AnyNotifier::Webhook(WebhookNotifier::new(webhook.clone())),
        _ => AnyNotifier::Log(LogNotifier),
    };

    let supervisor = Supervisor::new(
        engine,
        source,
        actuator,
        notifier,
        settings.app_name.clone(),
        settings.poll_interval(),
    );

    if cli.once {
        let action = supervisor.cycle().await?;
        info!(?action, "single cycle complete");
        return Ok(());
    }

    // Graceful shutdown on Ctrl-C.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    supervisor.run(shutdown_rx).await;
    Ok(())
}

/// Load local settings, merge the remote document over them when one is
/// configured, and validate the result. A failed remote fetch falls back
/// to the local document so a config-service outage cannot stop scaling.
async fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::from_file(&cli.settings)?;

    if let Some(remote) = settings.remote.clone() {
        info!(url = %remote.url, "fetching remote settings");
        match http::get_text(&remote.url).await {
            Ok(body) => {
                settings = settings.apply_remote(&body)?;
            }
            Err(e) => {
                warn!(error = %e, url = %remote.url, "remote settings unavailable, using local");
            }
        }
    }

    settings.validate()?;
    Ok(settings)
}
