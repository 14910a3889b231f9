//! Configuration loading and typed config structures for the brain.
//!
//! A brain is configured from a YAML document. Every field has a default,
//! so an empty document is valid. The `strategy` section holds the
//! planning, estimation, and negotiation parameters; the rest are the
//! brain's own safety bounds and pacing.
//!
//! Environment variables override two YAML values:
//! - `SETTLER_PACING_MS` overrides `pacing_ms`
//! - `SETTLER_TRADING` overrides `trading` (`true`/`false`, `1`/`0`)

use std::path::Path;

use serde::{Deserialize, Serialize};
use settler_strategy::StrategyConfig;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Everything a brain needs to know at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainConfig {
    /// Planner, estimator, and negotiator parameters.
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Denied requests tolerated in one turn before the turn is ended.
    #[serde(default = "default_max_denials_per_turn")]
    pub max_denials_per_turn: u32,

    /// Denied opening placements tolerated before leaving the game.
    #[serde(default = "default_max_opening_denials")]
    pub max_opening_denials: u32,

    /// Pulses within one turn after which the brain leaves the game.
    #[serde(default = "default_abandon_after_pulses")]
    pub abandon_after_pulses: u64,

    /// Pulses without an answer before a pending request is sent again.
    #[serde(default = "default_stall_resend_pulses")]
    pub stall_resend_pulses: u64,

    /// Faults tolerated during our own turn before the turn is ended.
    #[serde(default = "default_max_faults_per_turn")]
    pub max_faults_per_turn: u32,

    /// Delay before each outbound request, in milliseconds (0 = none).
    #[serde(default)]
    pub pacing_ms: u64,

    /// Whether the brain trades with other players at all.
    #[serde(default = "default_true")]
    pub trading: bool,

    /// Number of recent events kept for the status dump.
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            max_denials_per_turn: default_max_denials_per_turn(),
            max_opening_denials: default_max_opening_denials(),
            abandon_after_pulses: default_abandon_after_pulses(),
            stall_resend_pulses: default_stall_resend_pulses(),
            max_faults_per_turn: default_max_faults_per_turn(),
            pacing_ms: 0,
            trading: true,
            history_len: default_history_len(),
        }
    }
}

impl BrainConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a map.
        if yaml.trim().is_empty() {
            let mut config = Self::default();
            config.apply_env_overrides();
            return Ok(config);
        }
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override pacing and trading from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SETTLER_PACING_MS") {
            match val.trim().parse::<u64>() {
                Ok(ms) => self.pacing_ms = ms,
                Err(_) => warn!(value = %val, "ignoring unparseable SETTLER_PACING_MS"),
            }
        }
        if let Ok(val) = std::env::var("SETTLER_TRADING") {
            match parse_flag(&val) {
                Some(flag) => self.trading = flag,
                None => warn!(value = %val, "ignoring unparseable SETTLER_TRADING"),
            }
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

const fn default_max_denials_per_turn() -> u32 {
    4
}

const fn default_max_opening_denials() -> u32 {
    8
}

const fn default_abandon_after_pulses() -> u64 {
    3_000
}

const fn default_stall_resend_pulses() -> u64 {
    20
}

const fn default_max_faults_per_turn() -> u32 {
    3
}

const fn default_true() -> bool {
    true
}

const fn default_history_len() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use settler_strategy::PlannerKind;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BrainConfig::default();
        assert_eq!(config.max_denials_per_turn, 4);
        assert_eq!(config.strategy.eta_cutoff, 40);
        assert!(config.trading);
        assert_eq!(config.pacing_ms, 0);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
strategy:
  planner: one_ply
  eta_cutoff: 30
  human_response_pulses: 60
max_denials_per_turn: 2
max_opening_denials: 5
abandon_after_pulses: 900
stall_resend_pulses: 10
max_faults_per_turn: 1
history_len: 8
";
        let config = BrainConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.strategy.planner, PlannerKind::OnePly);
        assert_eq!(config.strategy.eta_cutoff, 30);
        assert_eq!(config.strategy.human_response_pulses, 60);
        // Unnamed strategy fields keep their defaults.
        assert_eq!(config.strategy.bot_response_pulses, 5);
        assert_eq!(config.max_denials_per_turn, 2);
        assert_eq!(config.abandon_after_pulses, 900);
        assert_eq!(config.history_len, 8);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = BrainConfig::parse("max_faults_per_turn: 7\n");
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();
        assert_eq!(config.max_faults_per_turn, 7);
        assert_eq!(config.stall_resend_pulses, 20);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(BrainConfig::parse("").is_ok());
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("settler-config.yaml");
        if path.exists() {
            let config = BrainConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
