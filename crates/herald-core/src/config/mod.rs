//! Configuration for herald.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HeraldError, HeraldResult};
use crate::rules::RuleFailurePolicy;

/// Service configuration.
///
/// Every field has a default, so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    /// SQLite database holding events and notification history.
    pub database_path: PathBuf,
    /// YAML file with the `rules:` list.
    pub rules_path: PathBuf,
    /// YAML file with the `notifications:` list.
    pub notifications_path: PathBuf,
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
    /// Capacity of the event dispatch queue, in batches.
    pub queue_capacity: usize,
    /// How malformed rules are handled during routing.
    pub rule_failure_policy: RuleFailurePolicy,
    /// Page size of the audit endpoint when no limit is given.
    pub audit_default_limit: usize,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        let herald_dir = dirs::home_dir()
            .map(|h| h.join(".herald"))
            .unwrap_or_else(|| PathBuf::from(".herald"));

        Self {
            database_path: herald_dir.join("herald.db"),
            rules_path: PathBuf::from("config/notification_rules.yml"),
            notifications_path: PathBuf::from("config/notifications.yaml"),
            host: "0.0.0.0".to_string(),
            port: 8080,
            queue_capacity: 1024,
            rule_failure_policy: RuleFailurePolicy::default(),
            audit_default_limit: 50,
        }
    }
}

impl HeraldConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> HeraldResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| HeraldError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| HeraldError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| HeraldError::Configuration(e.to_string())),
            _ => Err(HeraldError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from `HERALD_*` environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        Self::default().apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup, using the `HERALD_*` names.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("HERALD_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("HERALD_RULES_PATH") {
            self.rules_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("HERALD_NOTIFICATIONS_PATH") {
            self.notifications_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("HERALD_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("HERALD_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(capacity) = lookup("HERALD_QUEUE_CAPACITY").and_then(|c| c.parse().ok()) {
            self.queue_capacity = capacity;
        }
        if let Some(policy) = lookup("HERALD_RULE_FAILURE_POLICY") {
            match policy.to_lowercase().as_str() {
                "skip_rule" | "skip" => self.rule_failure_policy = RuleFailurePolicy::SkipRule,
                "fail_fast" | "fail" => self.rule_failure_policy = RuleFailurePolicy::FailFast,
                _ => {}
            }
        }
        if let Some(limit) = lookup("HERALD_AUDIT_DEFAULT_LIMIT").and_then(|l| l.parse().ok()) {
            self.audit_default_limit = limit;
        }
        self
    }

    /// Builder method to set the database path
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Builder method to set both catalog paths
    pub fn with_catalogs(mut self, rules: impl Into<PathBuf>, notifications: impl Into<PathBuf>) -> Self {
        self.rules_path = rules.into();
        self.notifications_path = notifications.into();
        self
    }

    /// Builder method to set the malformed rule policy
    pub fn with_rule_failure_policy(mut self, policy: RuleFailurePolicy) -> Self {
        self.rule_failure_policy = policy;
        self
    }

    /// Address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> HeraldResult<()> {
        if self.queue_capacity == 0 {
            return Err(HeraldError::Configuration(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.audit_default_limit == 0 {
            return Err(HeraldError::Configuration(
                "audit_default_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
