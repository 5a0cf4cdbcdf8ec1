// config.rs — Aggregated session configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gk_audit::AuditorConfig;
use gk_recall::RecallConfig;
use gk_retry::RetryConfig;

/// Everything a [`GuardSession`](crate::GuardSession) needs tuned, in
/// one YAML-loadable document. Every section and every field is
/// optional; omissions fill from the calibrated defaults.
///
/// ```yaml
/// auditor:
///   mode: strict
///   verbosity: verbose
///   blacklist: ["shell_exec"]
/// recall:
///   similarity_threshold: 0.6
/// retry:
///   max_attempts: 3
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GuardConfig {
    #[serde(default)]
    pub auditor: AuditorConfig,
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse guard config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl GuardConfig {
    /// Parse a YAML configuration document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }
}
