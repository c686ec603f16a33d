//! flotilla-core — domain types and configuration for the Flotilla
//! autoscaler.
//!
//! Defines the fleet snapshot consumed by the decision engine, the action
//! it produces, and the settings document (rules, bounds, collaborator
//! endpoints) the daemon loads at startup.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ActuatorConfig, NotifyConfig, RemoteConfig, Rule, RuleSet, Settings, SourceConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{Action, ContainerState, ContainerStats, FleetSnapshot, MetricName, MetricSet};
