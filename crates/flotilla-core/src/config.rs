//! Settings document parser.
//!
//! Local settings are TOML; a remotely fetched document is JSON and is
//! deep-merged over the local one (remote wins). Field names are camelCase
//! to match the configuration documents the fleet dashboard consumes.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// One named threshold rule: predicate key → configured threshold.
///
/// Keys are matched against the engine's predicate catalog; unknown keys
/// are carried but never evaluated. An empty rule is "not applicable",
/// never "false".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rule(BTreeMap<String, f64>);

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a threshold, returning `self` for builder-style chaining.
    pub fn with(mut self, key: &str, threshold: f64) -> Self {
        self.0.insert(key.to_string(), threshold);
        self
    }

    /// The configured threshold for `key`, if present.
    pub fn threshold(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The three threshold rules plus hard capacity bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSet {
    pub add_when: Rule,
    pub reduce_when: Rule,
    pub kill_when: Rule,
    pub min_containers: u32,
    pub max_containers: u32,
    pub containers_per_step: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            add_when: Rule::default(),
            reduce_when: Rule::default(),
            kill_when: Rule::default(),
            min_containers: 2,
            max_containers: 10,
            containers_per_step: 1,
        }
    }
}

/// Where the daemon fetches fleet snapshots from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceConfig {
    /// HTTP endpoint returning a JSON `FleetSnapshot`.
    pub endpoint: String,
}

/// Where scale actions are dispatched to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActuatorConfig {
    /// HTTP endpoint accepting a JSON `Action` via POST. When absent,
    /// actions are logged only.
    pub endpoint: Option<String>,
    /// Log actions instead of dispatching them.
    pub dry_run: bool,
}

/// Where alert/informational text is delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotifyConfig {
    /// Webhook accepting `{"text": …}` via POST.
    pub webhook: Option<String>,
    /// Log notifications instead of sending them.
    pub silent: bool,
}

/// Optional remote settings document, merged over the local one at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    pub url: String,
}

/// Top-level settings document for the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub app_name: String,
    pub poll_interval_secs: u64,
    pub source: SourceConfig,
    pub actuator: ActuatorConfig,
    pub notify: NotifyConfig,
    pub remote: Option<RemoteConfig>,
    pub autoscale: RuleSet,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            poll_interval_secs: 60,
            source: SourceConfig::default(),
            actuator: ActuatorConfig::default(),
            notify: NotifyConfig::default(),
            remote: None,
            autoscale: RuleSet::default(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Deep-merge a remote JSON settings document over this one.
    ///
    /// Objects merge recursively, remote values win everywhere else.
    pub fn apply_remote(&self, json: &str) -> ConfigResult<Self> {
        let mut base = serde_json::to_value(self)?;
        let overlay: Value = serde_json::from_str(json)?;
        merge_values(&mut base, overlay);
        Ok(serde_json::from_value(base)?)
    }

    /// Reject configurations the engine must never see.
    pub fn validate(&self) -> ConfigResult<()> {
        let rules = &self.autoscale;
        if rules.min_containers > rules.max_containers {
            return Err(ConfigError::BoundsInverted {
                min: rules.min_containers,
                max: rules.max_containers,
            });
        }
        if rules.containers_per_step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.source.endpoint.is_empty() {
            return Err(ConfigError::MissingSourceEndpoint);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
