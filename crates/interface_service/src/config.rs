//! Routing engine configuration

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use domain_routing::{EngineKind, PipelineConfig, RouterDefaults};

/// Environment prefix for every setting, e.g. `ROUTING_ENGINE=fallback`
pub const ENV_PREFIX: &str = "ROUTING";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Routing engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Push (`reactive`) or pull-only (`fallback`) engine
    pub engine: EngineKind,
    /// JSON rule file; rules stay in memory when unset
    pub rules_file: Option<PathBuf>,
    /// Seed the standard rules when the store loads empty
    pub seed_default_rules: bool,
    /// Team used when no rule matches
    pub default_team: String,
    /// Adjuster used when no rule matches
    pub default_adjuster: String,
    /// Capacity of the rule change and reroute channels
    pub event_buffer: usize,
    /// Upper bound on waiting for reconciliation after a rule change
    pub reconcile_timeout_ms: u64,
    /// Seconds between health log lines; 0 disables them
    pub health_interval_secs: u64,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let defaults = RouterDefaults::default();
        Self {
            engine: EngineKind::Reactive,
            rules_file: None,
            seed_default_rules: true,
            default_team: defaults.team,
            default_adjuster: defaults.adjuster,
            event_buffer: 256,
            reconcile_timeout_ms: 5000,
            health_interval_secs: 60,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl RoutingConfig {
    /// Loads configuration from `ROUTING_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Loads configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn from_source(env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn router_defaults(&self) -> RouterDefaults {
        RouterDefaults {
            team: self.default_team.clone(),
            adjuster: self.default_adjuster.clone(),
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            event_buffer: self.event_buffer,
            reconcile_timeout: Duration::from_millis(self.reconcile_timeout_ms),
        }
    }

    pub fn health_interval(&self) -> Option<Duration> {
        (self.health_interval_secs > 0).then(|| Duration::from_secs(self.health_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = RoutingConfig::from_vars(HashMap::new()).unwrap();
        assert_eq!(config, RoutingConfig::default());
        assert_eq!(config.router_defaults(), RouterDefaults::default());
        assert_eq!(config.pipeline().reconcile_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_environment_overrides() {
        let config = RoutingConfig::from_vars(vars(&[
            ("ROUTING_ENGINE", "fallback"),
            ("ROUTING_RULES_FILE", "/var/lib/routing/rules.json"),
            ("ROUTING_SEED_DEFAULT_RULES", "false"),
            ("ROUTING_EVENT_BUFFER", "32"),
            ("ROUTING_RECONCILE_TIMEOUT_MS", "250"),
            ("ROUTING_HEALTH_INTERVAL_SECS", "0"),
            ("ROUTING_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.engine, EngineKind::Fallback);
        assert_eq!(
            config.rules_file.as_deref(),
            Some(std::path::Path::new("/var/lib/routing/rules.json"))
        );
        assert!(!config.seed_default_rules);
        assert_eq!(config.pipeline().event_buffer, 32);
        assert_eq!(config.pipeline().reconcile_timeout, Duration::from_millis(250));
        assert!(config.health_interval().is_none());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        let result = RoutingConfig::from_vars(vars(&[("ROUTING_ENGINE", "streaming")]));
        assert!(result.is_err());
    }
}
